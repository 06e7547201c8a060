pub mod ai;
pub mod commit;
pub mod normalize;
pub mod ofx;
pub mod rules;
pub mod staging;
pub(crate) mod util;

pub use ai::{
    AiError, CategoryProposals, CategorySuggester, ClassificationRequest, ClassificationResult,
    HttpSuggester, PendingClassification, StaticSuggester,
};
pub use commit::ImportCommitter;
pub use normalize::{FieldNormalizer, NormalizedFields, GENERIC_DESCRIPTION};
pub use ofx::{RawRecord, RecordParser};
pub use rules::{ClassificationRule, RuleClassifier, RuleTableError, DEFAULT_CATEGORY, UNCATEGORIZED};
pub use staging::{Candidate, ImportSession, StagingField, StagingId, StagingItem};
pub use util::decode_statement;

pub mod import {
    use crate::*;
    use caixa_core::CategoryCatalogue;

    pub fn import_ofx(
        data: &[u8],
        classifier: &RuleClassifier,
        catalogue: CategoryCatalogue,
        units: Vec<String>,
    ) -> ImportSession {
        ImportSession::from_bytes(data, classifier, catalogue, units)
    }

    pub fn load_rule_table(toml_content: &str) -> Result<RuleClassifier, RuleTableError> {
        RuleClassifier::from_toml(toml_content)
    }
}
