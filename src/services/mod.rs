pub mod text_service;
