//! Caller context threaded through every core operation

use std::fmt;

/// Resolved identity of an authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub user_id: String,
    pub is_admin: bool,
}

impl Identity {
    pub fn client(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            is_admin: false,
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            is_admin: true,
        }
    }
}

/// Who is calling, as established by the identity gate
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CallerContext {
    /// No session, or a session that failed verification
    #[default]
    Anonymous,
    Authenticated(Identity),
}

impl CallerContext {
    pub fn client(user_id: impl Into<String>) -> Self {
        Self::Authenticated(Identity::client(user_id))
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self::Authenticated(Identity::admin(user_id))
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(identity) => Some(identity),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.identity().is_some_and(|identity| identity.is_admin)
    }
}

impl fmt::Display for CallerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => write!(f, "anonymous"),
            Self::Authenticated(identity) if identity.is_admin => {
                write!(f, "admin:{}", identity.user_id)
            }
            Self::Authenticated(identity) => write!(f, "client:{}", identity.user_id),
        }
    }
}
