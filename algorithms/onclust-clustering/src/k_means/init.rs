use onclust::{Clust, Error, Result, Space};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Strategy producing the starting centroids.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub enum KMeansInit<P> {
    /// Start from the given centroids.
    Given(Clust<P>),
    /// Sample `k` distinct buffered elements.
    Random,
    /// k-means++ seeding: each further centroid is drawn with probability
    /// proportional to its squared distance to the nearest chosen one.
    PlusPlus,
}

impl<P: Clone> KMeansInit<P> {
    pub(crate) fn run<S, R>(&self, space: &S, k: usize, data: &[P], rng: &mut R) -> Result<Clust<P>>
    where
        S: Space<Point = P>,
        R: Rng,
    {
        match self {
            KMeansInit::Given(seed) => Ok(seed.deep_copy(space)),
            KMeansInit::Random => {
                if data.len() < k {
                    return Err(Error::NotEnoughData);
                }
                let indices = rand::seq::index::sample(rng, data.len(), k);
                Ok(Clust::from(
                    indices.iter().map(|index| space.copy(&data[index])).collect::<Vec<_>>(),
                ))
            }
            KMeansInit::PlusPlus => {
                if data.len() < k {
                    return Err(Error::NotEnoughData);
                }
                let mut centroids = Vec::with_capacity(k);
                centroids.push(space.copy(&data[rng.gen_range(0..data.len())]));
                while centroids.len() < k {
                    let weights: Vec<f64> = data
                        .iter()
                        .map(|point| {
                            centroids
                                .iter()
                                .map(|centroid| space.dist(point, centroid))
                                .fold(f64::INFINITY, f64::min)
                                .powi(2)
                        })
                        .collect();
                    // all weights collapse to zero when every element is
                    // already a centroid; fall back to a uniform draw
                    let next = match WeightedIndex::new(&weights) {
                        Ok(weighted) => weighted.sample(rng),
                        Err(_) => rng.gen_range(0..data.len()),
                    };
                    centroids.push(space.copy(&data[next]));
                }
                Ok(Clust::from(centroids))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::euclid::Euclid;
    use ndarray::{array, Array1};
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    fn data() -> Vec<Array1<f64>> {
        vec![
            array![0.0, 0.0],
            array![0.1, 0.0],
            array![10.0, 10.0],
            array![10.1, 10.0],
            array![-10.0, 5.0],
            array![-10.1, 5.0],
        ]
    }

    #[test]
    fn given_returns_a_deep_copy_of_the_seed() {
        let seed = Clust::from(vec![array![1.0], array![2.0]]);
        let init = KMeansInit::Given(seed.clone());
        let mut rng = Xoshiro256Plus::seed_from_u64(0);
        let clust = init.run(&Euclid, 2, &[], &mut rng).unwrap();
        assert_eq!(clust, seed);
    }

    #[test]
    fn random_needs_enough_data() {
        let init: KMeansInit<Array1<f64>> = KMeansInit::Random;
        let mut rng = Xoshiro256Plus::seed_from_u64(0);
        let result = init.run(&Euclid, 3, &data()[..2], &mut rng);
        assert_eq!(result, Err(Error::NotEnoughData));
    }

    #[test]
    fn random_samples_distinct_elements() {
        let init: KMeansInit<Array1<f64>> = KMeansInit::Random;
        let mut rng = Xoshiro256Plus::seed_from_u64(7);
        let points = data();
        let clust = init.run(&Euclid, 3, &points, &mut rng).unwrap();
        assert_eq!(clust.len(), 3);
        for centroid in clust.iter() {
            assert!(points.contains(centroid));
        }
    }

    #[test]
    fn plus_plus_picks_centroids_from_the_data() {
        let init: KMeansInit<Array1<f64>> = KMeansInit::PlusPlus;
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let points = data();
        let clust = init.run(&Euclid, 3, &points, &mut rng).unwrap();
        assert_eq!(clust.len(), 3);
        for centroid in clust.iter() {
            assert!(points.contains(centroid));
        }
    }

    #[test]
    fn plus_plus_survives_duplicate_points() {
        let init: KMeansInit<Array1<f64>> = KMeansInit::PlusPlus;
        let mut rng = Xoshiro256Plus::seed_from_u64(1);
        let points = vec![array![1.0]; 4];
        let clust = init.run(&Euclid, 2, &points, &mut rng).unwrap();
        assert_eq!(clust.len(), 2);
    }
}
