pub mod environment;
pub mod paths;
pub mod terminal;

pub use environment::{ExtractorConfig, USER_DATA_DIR_ENV, get_user_data_dir};
pub use paths::{decode_folder_uri, display_name, format_path_with_tilde, validate_file_size};
