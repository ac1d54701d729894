//! ARN decomposition.
//!
//! An ARN is a six-field resource identifier of the form
//! `arn:partition:service:region:account:resource`. The resource field may
//! itself contain colons, so the split is limited to six sections.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const ARN_PREFIX: &str = "arn:";
const ARN_DELIMITER: char = ':';
const ARN_SECTIONS: usize = 6;

/// The individual fields of an Amazon Resource Name.
///
/// Example ARNs:
/// - `arn:aws:iam::123456789012:user/David`
/// - `arn:aws:s3:::my_corporate_bucket/exampleobject.png`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arn {
    /// The partition the resource is in, e.g. `aws`.
    pub partition: String,
    /// The service namespace, e.g. `s3` or `ssm`.
    pub service: String,
    /// The region the resource resides in. May be empty.
    pub region: String,
    /// The owning account ID. May be empty.
    pub account_id: String,
    /// Service-specific resource identifier; may contain colons and slashes.
    pub resource: String,
}

impl Arn {
    /// Parses an ARN into its constituent parts.
    ///
    /// Accepts if the string begins with `arn:` and splits into exactly six
    /// sections on `:` with a split limit of six.
    pub fn parse(arn: &str) -> Result<Self> {
        if !arn.starts_with(ARN_PREFIX) {
            return Err(Error::ArnInvalidPrefix);
        }
        let sections: Vec<&str> = arn.splitn(ARN_SECTIONS, ARN_DELIMITER).collect();
        if sections.len() != ARN_SECTIONS {
            return Err(Error::ArnNotEnoughSections);
        }
        Ok(Self {
            partition: sections[1].to_string(),
            service: sections[2].to_string(),
            region: sections[3].to_string(),
            account_id: sections[4].to_string(),
            resource: sections[5].to_string(),
        })
    }
}

impl std::fmt::Display for Arn {
    /// Produces the canonical six-section form.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "arn:{}:{}:{}:{}:{}",
            self.partition, self.service, self.region, self.account_id, self.resource
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iam_user() {
        let arn = Arn::parse("arn:aws:iam::123456789012:user/David").unwrap();

        assert_eq!(arn.partition, "aws");
        assert_eq!(arn.service, "iam");
        assert_eq!(arn.region, "");
        assert_eq!(arn.account_id, "123456789012");
        assert_eq!(arn.resource, "user/David");
    }

    #[test]
    fn test_parse_preserves_resource_colons() {
        let arn = Arn::parse("arn:aws:rds:eu-west-1:123456789012:db:mysql-db").unwrap();

        assert_eq!(arn.service, "rds");
        assert_eq!(arn.resource, "db:mysql-db");
    }

    #[test]
    fn test_parse_invalid_prefix() {
        assert!(matches!(
            Arn::parse("not-an-arn"),
            Err(Error::ArnInvalidPrefix)
        ));
    }

    #[test]
    fn test_parse_not_enough_sections() {
        assert!(matches!(
            Arn::parse("arn:aws:s3::bucket"),
            Err(Error::ArnNotEnoughSections)
        ));
    }

    #[test]
    fn test_format_roundtrip() {
        let input = "arn:aws:s3:::my_corporate_bucket/exampleobject.png";
        let arn = Arn::parse(input).unwrap();

        assert_eq!(arn.to_string(), input);
        assert_eq!(Arn::parse(&arn.to_string()).unwrap(), arn);
    }
}
