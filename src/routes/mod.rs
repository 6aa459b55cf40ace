pub mod system_routes;
pub mod text_routes;
