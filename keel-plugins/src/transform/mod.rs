pub mod cors;
pub mod json_body;
pub mod url_normalize;
