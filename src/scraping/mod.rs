pub mod browser_manager;
pub mod dropdown;
pub mod extract;
pub mod filters;
pub mod session;
