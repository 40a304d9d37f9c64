pub mod lifecycle;
pub mod ordering;
pub mod pincode;
pub mod visibility;
