pub mod db_utils;
pub mod email_registry;
pub mod tenant_host;
pub mod validation;
