pub mod aggregator_service;
pub mod backend_service;
pub mod certificate_service;
pub mod certificate_template;
pub mod fake;
pub mod list_filter_service;
pub mod normalizer_service;
pub mod pdf_service;
pub mod result_service;
pub mod title_service;
