//! # microdb-schemas
//!
//! The six database schemas built on the `microdb` engine, plus the
//! [`SchemaKind`] registry used by the `microdb-admin` tool.
//!
//! | Schema | Version | Tables |
//! |---|---|---|
//! | [`directory`] | 5 | File, Permission, Metadata, Relationships, NamedPermission |
//! | [`log`] | 4 | Classes, Log, Lifespan |
//! | [`name_value_pairs`] | 2 | Pairs |
//! | [`session_manager`] | 3 | Session |
//! | [`user`] | 2 | Pairs, Notification, ChangeData, Sender, Token, Blocked, ObjectState, Deleted |
//! | [`user_manager`] | 2 | Users, Groups, UserInGroups, AssociationHandles |

use std::fmt;
use std::path::PathBuf;

use microdb::{Connector, SchemaDefinition};

pub mod directory;
pub mod log;
pub mod name_value_pairs;
pub mod session_manager;
pub mod user;
pub mod user_manager;

/// One of the known schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum SchemaKind {
    Directory,
    Log,
    NameValuePairs,
    SessionManager,
    User,
    UserManager,
}

impl SchemaKind {
    /// Every schema, in documentation order.
    pub const ALL: [Self; 6] = [
        Self::Directory,
        Self::Log,
        Self::NameValuePairs,
        Self::SessionManager,
        Self::User,
        Self::UserManager,
    ];

    /// The schema definition.
    #[must_use]
    pub fn definition(self) -> &'static SchemaDefinition {
        match self {
            Self::Directory => &directory::SCHEMA,
            Self::Log => &log::SCHEMA,
            Self::NameValuePairs => &name_value_pairs::SCHEMA,
            Self::SessionManager => &session_manager::SCHEMA,
            Self::User => &user::SCHEMA,
            Self::UserManager => &user_manager::SCHEMA,
        }
    }

    /// Looks a schema up by its definition name, ignoring case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.definition().name.eq_ignore_ascii_case(name))
    }

    /// A connector for a file of this schema.
    pub fn connector(self, path: impl Into<PathBuf>) -> Connector {
        Connector::new(path, self.definition())
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.definition().name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(SchemaKind::from_name("Directory"), Some(SchemaKind::Directory));
        assert_eq!(
            SchemaKind::from_name("namevaluepairs"),
            Some(SchemaKind::NameValuePairs)
        );
        assert_eq!(SchemaKind::from_name("Events"), None);
    }

    #[test]
    fn test_target_versions() {
        let versions: Vec<_> = SchemaKind::ALL
            .iter()
            .map(|kind| (kind.to_string(), kind.definition().target_version))
            .collect();
        assert_eq!(
            versions,
            vec![
                ("Directory".to_string(), 5),
                ("Log".to_string(), 4),
                ("NameValuePairs".to_string(), 2),
                ("SessionManager".to_string(), 3),
                ("User".to_string(), 2),
                ("UserManager".to_string(), 2),
            ]
        );
    }

    #[test]
    fn test_every_schema_has_a_complete_step_chain() {
        for kind in SchemaKind::ALL {
            let schema = kind.definition();
            for version in 1..schema.target_version {
                assert!(
                    schema.step_from(version).is_some(),
                    "{kind} has no step from {version}"
                );
            }
            assert_eq!(schema.steps.len() as i64, schema.target_version - 1);
        }
    }
}
