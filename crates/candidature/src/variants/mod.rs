//! # Variants
//!
//! Every response has the same record type; its [`VariantKind`] selects which
//! rules govern the value. A [`Variant`] is that composition: a schema-shape
//! rule plus an ordered list of [`FieldRule`]s.
//!
//! ## Composition
//!
//! | Kind | Rules after schema |
//! |------|--------------------|
//! | `text`, `email`, `phone`, `url` | text (with format) |
//! | `checkbox` | checkbox |
//! | `checkbox_with_document` | checkbox, files, documents only when checked |
//! | `file_upload` | files, at least one document |
//! | `radio_with_file_and_text` | radio, text, files, reveal on yes |
//! | `radio_with_justification_required` | radio, text, files, reveal on no + document |
//! | `radio_with_justification_optional` | radio, text, files, reveal on no |
//! | `file_or_textarea` | text, files, text or document |
//! | `yearly_turnover`, `yearly_workforce` | yearly table |
//! | `team_members`, `past_deliveries`, `samples` | files, repeatable, items |
//!
//! ## Registry
//!
//! [`VariantRegistry`] builds every composition once from the engine
//! configuration. A kind without a schema declaration in [`spec::VARIANTS`]
//! is a programming error: construction fails with
//! [`CandidatureError::Registry`] instead of failing per request.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{CandidatureError, Result};
use crate::items::ItemSchema;
use crate::rules::{
    CheckboxRule, DocumentsOnlyWhenChecked, FieldRule, FileLimits, FileRule, ItemsRule,
    MinimumDocuments, RadioChoice, RadioConditionalRule, RadioRule, RepeatableRule, SchemaRule,
    TextFormat, TextOrDocument, TextRule, YearlyRule,
};

pub mod spec;

pub use spec::{get_spec, VariantSpec, VARIANTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    Text,
    Email,
    Phone,
    Url,
    Checkbox,
    CheckboxWithDocument,
    FileUpload,
    RadioWithFileAndText,
    RadioWithJustificationRequired,
    RadioWithJustificationOptional,
    FileOrTextarea,
    YearlyTurnover,
    YearlyWorkforce,
    TeamMembers,
    PastDeliveries,
    Samples,
}

impl VariantKind {
    pub const ALL: &'static [VariantKind] = &[
        VariantKind::Text,
        VariantKind::Email,
        VariantKind::Phone,
        VariantKind::Url,
        VariantKind::Checkbox,
        VariantKind::CheckboxWithDocument,
        VariantKind::FileUpload,
        VariantKind::RadioWithFileAndText,
        VariantKind::RadioWithJustificationRequired,
        VariantKind::RadioWithJustificationOptional,
        VariantKind::FileOrTextarea,
        VariantKind::YearlyTurnover,
        VariantKind::YearlyWorkforce,
        VariantKind::TeamMembers,
        VariantKind::PastDeliveries,
        VariantKind::Samples,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VariantKind::Text => "text",
            VariantKind::Email => "email",
            VariantKind::Phone => "phone",
            VariantKind::Url => "url",
            VariantKind::Checkbox => "checkbox",
            VariantKind::CheckboxWithDocument => "checkbox_with_document",
            VariantKind::FileUpload => "file_upload",
            VariantKind::RadioWithFileAndText => "radio_with_file_and_text",
            VariantKind::RadioWithJustificationRequired => "radio_with_justification_required",
            VariantKind::RadioWithJustificationOptional => "radio_with_justification_optional",
            VariantKind::FileOrTextarea => "file_or_textarea",
            VariantKind::YearlyTurnover => "yearly_turnover",
            VariantKind::YearlyWorkforce => "yearly_workforce",
            VariantKind::TeamMembers => "team_members",
            VariantKind::PastDeliveries => "past_deliveries",
            VariantKind::Samples => "samples",
        }
    }

    pub fn is_radio(self) -> bool {
        matches!(
            self,
            VariantKind::RadioWithFileAndText
                | VariantKind::RadioWithJustificationRequired
                | VariantKind::RadioWithJustificationOptional
        )
    }

    pub fn is_repeatable(self) -> bool {
        matches!(
            self,
            VariantKind::TeamMembers | VariantKind::PastDeliveries | VariantKind::Samples
        )
    }

    pub fn is_yearly(self) -> bool {
        matches!(self, VariantKind::YearlyTurnover | VariantKind::YearlyWorkforce)
    }

    /// Value key a scalar extraction is stored under.
    ///
    /// Yearly, repeatable, and file-only variants only accept mappings.
    pub fn primary_key(self) -> Option<&'static str> {
        match self {
            VariantKind::Text
            | VariantKind::Email
            | VariantKind::Phone
            | VariantKind::Url
            | VariantKind::FileOrTextarea => Some("text"),
            VariantKind::Checkbox | VariantKind::CheckboxWithDocument => Some("checked"),
            VariantKind::RadioWithFileAndText
            | VariantKind::RadioWithJustificationRequired
            | VariantKind::RadioWithJustificationOptional => Some("radio_choice"),
            VariantKind::FileUpload
            | VariantKind::YearlyTurnover
            | VariantKind::YearlyWorkforce
            | VariantKind::TeamMembers
            | VariantKind::PastDeliveries
            | VariantKind::Samples => None,
        }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The rule composition of one variant kind.
pub struct Variant {
    pub kind: VariantKind,
    pub schema: SchemaRule,
    pub item_schema: Option<ItemSchema>,
    /// Rules in stage order. Rules of the same stage keep declaration order.
    rules: Vec<Box<dyn FieldRule>>,
}

impl Variant {
    pub fn new(
        kind: VariantKind,
        schema: SchemaRule,
        item_schema: Option<ItemSchema>,
        mut rules: Vec<Box<dyn FieldRule>>,
    ) -> Self {
        rules.sort_by_key(|rule| rule.stage());
        Self {
            kind,
            schema,
            item_schema,
            rules,
        }
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn FieldRule> {
        self.rules.iter().map(|rule| rule.as_ref())
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variant")
            .field("kind", &self.kind)
            .field("schema", &self.schema)
            .field("rules", &self.rule_names())
            .finish()
    }
}

/// Rules that follow the schema check for one kind.
fn compose(spec: &VariantSpec, config: &EngineConfig) -> Result<Vec<Box<dyn FieldRule>>> {
    let text = TextRule::new(config.max_text_length);
    let files = || Box::new(FileRule::new(FileLimits::from_config(config))) as Box<dyn FieldRule>;
    let missing = |what: &str| {
        CandidatureError::Registry(format!("variant {} declares no {}", spec.kind, what))
    };

    let rules: Vec<Box<dyn FieldRule>> = match spec.kind {
        VariantKind::Text => vec![Box::new(text)],
        VariantKind::Email => vec![Box::new(text.with_format(TextFormat::Email))],
        VariantKind::Phone => vec![Box::new(
            TextRule::new(config.max_phone_length).with_format(TextFormat::Phone),
        )],
        VariantKind::Url => vec![Box::new(text.with_format(TextFormat::Url))],
        VariantKind::Checkbox => vec![Box::new(CheckboxRule)],
        VariantKind::CheckboxWithDocument => vec![
            Box::new(CheckboxRule),
            files(),
            Box::new(DocumentsOnlyWhenChecked),
        ],
        VariantKind::FileUpload => vec![files(), Box::new(MinimumDocuments { min: 1 })],
        VariantKind::RadioWithFileAndText => vec![
            Box::new(RadioRule),
            Box::new(text),
            files(),
            Box::new(RadioConditionalRule::reveal_on(RadioChoice::Yes)),
        ],
        VariantKind::RadioWithJustificationRequired => vec![
            Box::new(RadioRule),
            Box::new(text),
            files(),
            Box::new(RadioConditionalRule::reveal_on(RadioChoice::No).with_required_document()),
        ],
        VariantKind::RadioWithJustificationOptional => vec![
            Box::new(RadioRule),
            Box::new(text),
            files(),
            Box::new(RadioConditionalRule::reveal_on(RadioChoice::No)),
        ],
        VariantKind::FileOrTextarea => vec![Box::new(text), files(), Box::new(TextOrDocument)],
        VariantKind::YearlyTurnover | VariantKind::YearlyWorkforce => {
            let table = spec.yearly.ok_or_else(|| missing("year table"))?;
            vec![Box::new(YearlyRule::new(table, config.min_year))]
        }
        VariantKind::TeamMembers | VariantKind::PastDeliveries | VariantKind::Samples => {
            let schema = spec.items.ok_or_else(|| missing("item schema"))?;
            vec![
                files(),
                Box::new(RepeatableRule::new(schema)),
                Box::new(ItemsRule::new(schema, config.max_text_length)),
            ]
        }
    };
    Ok(rules)
}

/// Maps each variant kind to its rule composition.
#[derive(Debug)]
pub struct VariantRegistry {
    variants: HashMap<VariantKind, Variant>,
}

impl VariantRegistry {
    /// Build the registry from the built-in declarations.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Self::from_specs(VARIANTS, config)
    }

    /// Build the registry from explicit declarations. Every kind must be
    /// declared exactly once.
    pub fn from_specs(specs: &[VariantSpec], config: &EngineConfig) -> Result<Self> {
        let mut variants = HashMap::new();
        for spec in specs {
            let variant = Variant::new(
                spec.kind,
                spec.schema,
                spec.items,
                compose(spec, config)?,
            );
            if variants.insert(spec.kind, variant).is_some() {
                return Err(CandidatureError::Registry(format!(
                    "variant {} is declared twice",
                    spec.kind
                )));
            }
        }
        if let Some(kind) = VariantKind::ALL.iter().find(|k| !variants.contains_key(*k)) {
            return Err(CandidatureError::Registry(format!(
                "variant {} declares no schema",
                kind
            )));
        }
        Ok(Self { variants })
    }

    pub fn get(&self, kind: VariantKind) -> Result<&Variant> {
        self.variants
            .get(&kind)
            .ok_or_else(|| CandidatureError::Registry(format!("variant {} is not registered", kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Stage;

    #[test]
    fn kind_tags_round_trip_through_serde() {
        for kind in VariantKind::ALL {
            let json = serde_json::to_string(kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            let back: VariantKind = serde_json::from_str(&json).unwrap();
            assert_eq!(back, *kind);
        }
    }

    #[test]
    fn registry_covers_every_kind() {
        let registry = VariantRegistry::new(&EngineConfig::default()).unwrap();
        for kind in VariantKind::ALL {
            assert_eq!(registry.get(*kind).unwrap().kind, *kind);
        }
    }

    #[test]
    fn missing_declaration_fails_at_construction() {
        let partial: Vec<VariantSpec> = VARIANTS
            .iter()
            .copied()
            .filter(|s| s.kind != VariantKind::Samples)
            .collect();
        let err = VariantRegistry::from_specs(&partial, &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, CandidatureError::Registry(msg) if msg.contains("samples")));
    }

    #[test]
    fn duplicate_declaration_fails() {
        let mut specs: Vec<VariantSpec> = VARIANTS.to_vec();
        specs.push(VARIANTS[0]);
        assert!(VariantRegistry::from_specs(&specs, &EngineConfig::default()).is_err());
    }

    #[test]
    fn repeatable_without_item_schema_fails() {
        let mut specs: Vec<VariantSpec> = VARIANTS.to_vec();
        for spec in specs.iter_mut() {
            if spec.kind == VariantKind::TeamMembers {
                spec.items = None;
            }
        }
        let err = VariantRegistry::from_specs(&specs, &EngineConfig::default()).unwrap_err();
        assert!(err.to_string().contains("item schema"));
    }

    #[test]
    fn rules_are_ordered_by_stage() {
        let registry = VariantRegistry::new(&EngineConfig::default()).unwrap();
        let variant = registry.get(VariantKind::RadioWithFileAndText).unwrap();
        assert_eq!(
            variant.rule_names(),
            vec!["radio", "text", "files", "radio_conditional"]
        );
        let stages: Vec<Stage> = variant.rules().map(|r| r.stage()).collect();
        let mut sorted = stages.clone();
        sorted.sort();
        assert_eq!(stages, sorted);
    }

    #[test]
    fn radio_helpers() {
        assert!(VariantKind::RadioWithJustificationOptional.is_radio());
        assert!(!VariantKind::Checkbox.is_radio());
        assert!(VariantKind::Samples.is_repeatable());
        assert!(VariantKind::YearlyWorkforce.is_yearly());
    }
}
