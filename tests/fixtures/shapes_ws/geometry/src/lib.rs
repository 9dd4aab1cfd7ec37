pub mod geo;

pub fn scale<T: Copy>(value: T) -> T {
    value
}

pub use geo::point::Point as Origin;
