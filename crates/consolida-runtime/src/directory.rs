//! Validator identity provisioning.
//!
//! Each validator institution evaluates through exactly one synthetic
//! evaluator account. Provisioning is create-if-absent and idempotent, so
//! it can run on every startup.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use tracing::debug;

use consolida_core::{Evaluator, EvaluatorId, ValidatorIdentity};

/// Account directory the orchestration provisions validator identities in.
pub trait IdentityDirectory: Send + Sync {
    /// The synthetic evaluator account for a validator, created on first
    /// call and returned unchanged afterwards.
    fn ensure_validator_identity(&self, identity: &ValidatorIdentity) -> Evaluator;

    /// The validator-group slug of an account, or `None` for humans and
    /// unknown accounts.
    fn validator_group(&self, evaluator: &EvaluatorId) -> Option<String>;
}

/// Directory kept in memory, keyed by slug.
#[derive(Default)]
pub struct InMemoryDirectory {
    accounts: RwLock<BTreeMap<String, EvaluatorId>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityDirectory for InMemoryDirectory {
    fn ensure_validator_identity(&self, identity: &ValidatorIdentity) -> Evaluator {
        let mut accounts = self.accounts.write();
        let id = accounts
            .entry(identity.slug.clone())
            .or_insert_with(|| {
                debug!(slug = %identity.slug, "provisioning validator account");
                EvaluatorId::new(identity.auth_uid())
            })
            .clone();

        Evaluator::Validator {
            id,
            group: identity.slug.clone(),
        }
    }

    fn validator_group(&self, evaluator: &EvaluatorId) -> Option<String> {
        let accounts = self.accounts.read();
        accounts
            .iter()
            .find(|(_, id)| *id == evaluator)
            .map(|(slug, _)| slug.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provisioning_is_idempotent() {
        let directory = InMemoryDirectory::new();
        let identity = ValidatorIdentity::new("Instituto Org1", "org1");

        let first = directory.ensure_validator_identity(&identity);
        let second = directory.ensure_validator_identity(&identity);

        assert_eq!(first, second);
        assert_eq!(first.id(), &EvaluatorId::new("org1@validator"));
        assert_eq!(first.validator_group(), Some("org1"));
    }

    #[test]
    fn test_group_lookup() {
        let directory = InMemoryDirectory::new();
        let account = directory
            .ensure_validator_identity(&ValidatorIdentity::new("Org1", "org1"));

        assert_eq!(
            directory.validator_group(account.id()),
            Some("org1".to_string())
        );
        assert_eq!(directory.validator_group(&EvaluatorId::new("maria")), None);
    }
}
