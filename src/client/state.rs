//! Client-side identity: the cached `UserInfo` slot and the principal built
//! from it for authorization-aware rendering.

use tokio::sync::RwLock;

use crate::{claims, types::UserInfo};

/// Authentication type reported for identities built from the server's answer.
pub const AUTHENTICATION_TYPE: &str = "Server authentication";

/// Last `UserInfo` fetched for one client session.
///
/// Shared through an `Arc` between the provider and whatever else needs to
/// inspect or reset it; there is no process-wide instance. Every `clear` starts
/// a new generation so a fetch begun before it cannot repopulate the slot.
#[derive(Debug, Default)]
pub struct StateStore {
    slot: RwLock<Slot>,
}

#[derive(Debug, Default)]
struct Slot {
    user_info: Option<UserInfo>,
    generation: u64,
}

impl StateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> Option<UserInfo> {
        self.slot.read().await.user_info.clone()
    }

    pub async fn generation(&self) -> u64 {
        self.slot.read().await.generation
    }

    pub async fn set(&self, user_info: UserInfo) {
        self.slot.write().await.user_info = Some(user_info);
    }

    /// Store `user_info` only if no `clear` happened since `generation` was read.
    pub async fn set_if_current(&self, generation: u64, user_info: UserInfo) -> bool {
        let mut slot = self.slot.write().await;
        if slot.generation != generation {
            return false;
        }
        slot.user_info = Some(user_info);
        true
    }

    pub async fn clear(&self) {
        let mut slot = self.slot.write().await;
        slot.user_info = None;
        slot.generation = slot.generation.wrapping_add(1);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientIdentity {
    authentication_type: String,
    claims: Vec<(String, String)>,
}

impl ClientIdentity {
    #[must_use]
    pub fn authentication_type(&self) -> &str {
        &self.authentication_type
    }

    /// Claims in issue order: `name` first, then the exposed claims.
    pub fn claims(&self) -> impl Iterator<Item = (&str, &str)> {
        self.claims
            .iter()
            .map(|(claim_type, value)| (claim_type.as_str(), value.as_str()))
    }
}

/// Principal the UI authorizes against; anonymous when `identity` is `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientPrincipal {
    identity: Option<ClientIdentity>,
}

impl ClientPrincipal {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn identity(&self) -> Option<&ClientIdentity> {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.find_claim(claims::NAME)
    }

    /// First claim of the given type.
    #[must_use]
    pub fn find_claim(&self, claim_type: &str) -> Option<&str> {
        self.identity()?
            .claims()
            .find(|(kind, _)| *kind == claim_type)
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn has_claim(&self, claim_type: &str, value: &str) -> bool {
        self.identity().is_some_and(|identity| {
            identity
                .claims()
                .any(|(kind, claim_value)| kind == claim_type && claim_value == value)
        })
    }

    #[must_use]
    pub fn is_in_role(&self, role: &str) -> bool {
        self.has_claim(claims::ROLE, role)
    }
}

/// Answer to "who is logged in".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthenticationState {
    user: ClientPrincipal,
}

impl AuthenticationState {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_user_info(user_info: &UserInfo) -> Self {
        if !user_info.is_authenticated {
            return Self::anonymous();
        }

        let claims = std::iter::once((claims::NAME.to_string(), user_info.name.clone()))
            .chain(
                user_info
                    .exposed_claims
                    .iter()
                    .map(|(claim_type, value)| (claim_type.to_string(), value.to_string())),
            )
            .collect();

        Self {
            user: ClientPrincipal {
                identity: Some(ClientIdentity {
                    authentication_type: AUTHENTICATION_TYPE.to_string(),
                    claims,
                }),
            },
        }
    }

    #[must_use]
    pub fn user(&self) -> &ClientPrincipal {
        &self.user
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_authenticated()
    }
}
