// 镜像名称校验
use crate::utils::error::TransferError;
use once_cell::sync::Lazy;
use regex::Regex;

const NAME_TOTAL_LENGTH_MAX: usize = 255;

static REFERENCE: Lazy<Regex> = Lazy::new(|| {
    let alnum = "[a-z0-9]+";
    let separator = "(?:[._]|__|[-]+)";
    let path_component = format!("{alnum}(?:{separator}{alnum})*");
    let domain_component = "(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9])";
    let domain = format!(r"{domain_component}(?:\.{domain_component})*(?::[0-9]+)?");
    let name = format!("(?:{domain}/)?{path_component}(?:/{path_component})*");
    let tag = r"[\w][\w.-]{0,127}";
    let digest = "[A-Za-z][A-Za-z0-9]*(?:[-_+.][A-Za-z][A-Za-z0-9]*)*:[0-9a-fA-F]{32,}";
    Regex::new(&format!("^(?P<name>{name})(?::{tag})?(?:@{digest})?$")).expect("reference pattern is valid")
});

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[a-f0-9]{64}$").expect("identifier pattern is valid"));

/// Checks that `input` is a syntactically valid, possibly short, image reference.
///
/// Short names such as `busybox` are accepted as-is and never expanded.
pub fn validate_image_name(input: &str) -> Result<(), TransferError> {
    if IDENTIFIER.is_match(input) {
        return Err(TransferError::InvalidArgument(format!(
            "invalid repository name ({}), cannot specify 64-byte hexadecimal strings",
            input
        )));
    }

    let captures = REFERENCE
        .captures(input)
        .ok_or_else(|| TransferError::InvalidArgument(format!("invalid reference format: {:?}", input)))?;

    if captures["name"].len() > NAME_TOTAL_LENGTH_MAX {
        return Err(TransferError::InvalidArgument(format!(
            "repository name must not be more than {} characters",
            NAME_TOTAL_LENGTH_MAX
        )));
    }
    Ok(())
}
