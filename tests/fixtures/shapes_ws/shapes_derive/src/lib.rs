#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    pub radius: f64,
}

#[derive(Clone, Copy)]
pub enum Kind {
    Round,
    Angular(u8),
}
