/// Error code registry for mask-consensus
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 2000-2999: Job discovery errors
/// - 3000-3999: Archive extraction errors
/// - 4000-4999: Mask container errors
/// - 5000-5999: Aggregation errors
/// - 6000-6999: Mask store errors
/// - 7000-7999: Validation errors
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_PARSE_ERROR: u16 = 1002;
    pub const CONFIG_INVALID_VALUE: u16 = 1003;

    // Discovery errors (2000-2999)
    pub const DISCOVERY_GENERIC: u16 = 2000;
    pub const DISCOVERY_BAD_PATTERN: u16 = 2001;
    pub const DISCOVERY_IO_ERROR: u16 = 2002;

    // Extraction errors (3000-3999)
    pub const EXTRACT_GENERIC: u16 = 3000;
    pub const EXTRACT_OPEN_FAILED: u16 = 3001;
    pub const EXTRACT_CORRUPT_ARCHIVE: u16 = 3002;
    pub const EXTRACT_WRITE_FAILED: u16 = 3003;
    pub const EXTRACT_SCRATCH_FAILED: u16 = 3004;

    // Mask container errors (4000-4999)
    pub const MASK_GENERIC: u16 = 4000;
    pub const MASK_OPEN_FAILED: u16 = 4001;
    pub const MASK_PARSE_ERROR: u16 = 4002;
    pub const MASK_WRITE_FAILED: u16 = 4003;

    // Aggregation errors (5000-5999)
    pub const AGG_GENERIC: u16 = 5000;
    pub const AGG_NO_SHAPE: u16 = 5001;
    pub const AGG_SHAPE_MISMATCH: u16 = 5002;
    pub const AGG_CANCELLED: u16 = 5003;
    pub const AGG_TASK_FAILED: u16 = 5004;
    pub const AGG_UNKNOWN_CLASS: u16 = 5005;
    pub const AGG_OUT_OF_BOUNDS: u16 = 5006;

    // Store errors (6000-6999)
    pub const STORE_GENERIC: u16 = 6000;
    pub const STORE_IO_ERROR: u16 = 6001;
    pub const STORE_LOCK_BUSY: u16 = 6002;
    pub const STORE_CORRUPTED: u16 = 6003;
    pub const STORE_NOT_AGGREGATED: u16 = 6004;
    pub const STORE_SERIALIZATION_ERROR: u16 = 6005;

    // Validation errors (7000-7999)
    pub const VALIDATION_GENERIC: u16 = 7000;
    pub const VALIDATION_UNKNOWN_CLASS: u16 = 7001;
    pub const VALIDATION_TOO_FEW_CLASSES: u16 = 7002;
    pub const VALIDATION_INVALID_ARGUMENT: u16 = 7003;
    pub const VALIDATION_NO_VOTES: u16 = 7004;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        ErrorCode::CONFIG_GENERIC => "General configuration error",
        ErrorCode::CONFIG_NOT_FOUND => "Configuration file not found",
        ErrorCode::CONFIG_PARSE_ERROR => "Configuration file could not be parsed",
        ErrorCode::CONFIG_INVALID_VALUE => "Invalid configuration value",

        ErrorCode::DISCOVERY_GENERIC => "General job discovery error",
        ErrorCode::DISCOVERY_BAD_PATTERN => "Job archive pattern is invalid",
        ErrorCode::DISCOVERY_IO_ERROR => "Job archive directory could not be read",

        ErrorCode::EXTRACT_GENERIC => "General extraction error",
        ErrorCode::EXTRACT_OPEN_FAILED => "Job archive could not be opened",
        ErrorCode::EXTRACT_CORRUPT_ARCHIVE => "Job archive is not a readable tar.gz",
        ErrorCode::EXTRACT_WRITE_FAILED => "Extracted mask could not be written",
        ErrorCode::EXTRACT_SCRATCH_FAILED => "Scratch directory could not be created",

        ErrorCode::MASK_GENERIC => "General mask container error",
        ErrorCode::MASK_OPEN_FAILED => "Mask container could not be opened",
        ErrorCode::MASK_PARSE_ERROR => "Mask container is not a dataset document",
        ErrorCode::MASK_WRITE_FAILED => "Mask container could not be written",

        ErrorCode::AGG_GENERIC => "General aggregation error",
        ErrorCode::AGG_NO_SHAPE => "No image shape could be determined",
        ErrorCode::AGG_SHAPE_MISMATCH => "Mask shape differs from the location shape",
        ErrorCode::AGG_CANCELLED => "Aggregation was cancelled",
        ErrorCode::AGG_TASK_FAILED => "Aggregation worker failed",
        ErrorCode::AGG_UNKNOWN_CLASS => "Resolved label references an unknown class",
        ErrorCode::AGG_OUT_OF_BOUNDS => "Resolved label lies outside the image shape",

        ErrorCode::STORE_GENERIC => "General mask store error",
        ErrorCode::STORE_IO_ERROR => "Mask store I/O error",
        ErrorCode::STORE_LOCK_BUSY => "Location is locked by another run",
        ErrorCode::STORE_CORRUPTED => "Mask store is inconsistent",
        ErrorCode::STORE_NOT_AGGREGATED => "Location has not been combined yet",
        ErrorCode::STORE_SERIALIZATION_ERROR => "Metadata could not be (de)serialized",

        ErrorCode::VALIDATION_GENERIC => "General validation error",
        ErrorCode::VALIDATION_UNKNOWN_CLASS => "Class is not recorded for this location",
        ErrorCode::VALIDATION_TOO_FEW_CLASSES => "Not enough classes for the metric",
        ErrorCode::VALIDATION_INVALID_ARGUMENT => "Invalid argument",
        ErrorCode::VALIDATION_NO_VOTES => "No pixel carries a vote",

        _ => "Unrecognized error code",
    }
}
