pub mod bin_ledger;
pub mod bin_service;
pub mod warehouse_service;
