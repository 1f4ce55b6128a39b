pub mod backend_dto;
pub mod view_dto;
