use num_traits::{Num, ToPrimitive};

/// Generic trait of point coordinates.
pub trait Scalar: Num + ToPrimitive + Copy + Default + Send + Sync + 'static {
    fn as_f64(self) -> f64;
}

impl Scalar for u8 {
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Scalar for f32 {
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Scalar for f64 {
    fn as_f64(self) -> f64 {
        self
    }
}
