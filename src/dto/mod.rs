pub mod interview_dto;
pub mod user_dto;
