pub mod bins;
pub mod warehouses;
