pub mod bottom;
pub mod central;
pub mod side;
pub mod top;
