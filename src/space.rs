/// Distance, weighted combination and duplication over an opaque element type.
///
/// A space is the only component allowed to interpret elements: the controller
/// and the generic algorithms manipulate points exclusively through it. Spaces
/// are small value types (usually unit or near-unit structs) and are cloned
/// freely.
///
/// Contract:
/// - `dist` is total and non-negative, with `dist(a, a) == 0`;
/// - `combine` returns the weighted centroid of the pair and is associative up
///   to weight accumulation. A zero total weight is a programming error and
///   asserts;
/// - `copy` yields a value independent from its source for all purposes,
///   including nested sequences.
pub trait Space: Clone + Send + Sync + 'static {
    /// The opaque observation type this space understands.
    type Point: Clone + std::fmt::Debug + Send + Sync + 'static;

    /// Distance between two points.
    fn dist(&self, a: &Self::Point, b: &Self::Point) -> f64;

    /// Weighted average of two points. `wa + wb` must be positive.
    fn combine(&self, a: &Self::Point, wa: f64, b: &Self::Point, wb: f64) -> Self::Point;

    /// Deep, independent duplicate of a point.
    fn copy(&self, point: &Self::Point) -> Self::Point {
        point.clone()
    }

    /// Natural dimensionality of the given sample, used for configuration
    /// defaults only.
    fn dim(&self, points: &[Self::Point]) -> usize;
}
