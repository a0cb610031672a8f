pub const DEFAULT_DATABASE_ID: &str = "(default)";
