//! Variant schema declarations.
//!
//! Every variant kind declares the shape of its value here: the allowed keys,
//! the keys a manual answer must fill, and the field schema errors are
//! reported on. Repeatable and yearly variants also name their field tables.

use super::VariantKind;
use crate::items::{ItemField, ItemFieldType, ItemSchema};
use crate::rules::{SchemaRule, SlotField, SlotFieldKind, YearlyTable};

/// Schema declaration for one variant kind.
#[derive(Debug, Clone, Copy)]
pub struct VariantSpec {
    pub kind: VariantKind,
    pub schema: SchemaRule,
    /// Item fields, for repeatable variants.
    pub items: Option<ItemSchema>,
    /// Year slot fields, for yearly variants.
    pub yearly: Option<YearlyTable>,
}

impl VariantSpec {
    const fn new(kind: VariantKind, schema: SchemaRule) -> Self {
        Self {
            kind,
            schema,
            items: None,
            yearly: None,
        }
    }

    const fn with_items(mut self, items: ItemSchema) -> Self {
        self.items = Some(items);
        self
    }

    const fn with_yearly(mut self, yearly: YearlyTable) -> Self {
        self.yearly = Some(yearly);
        self
    }
}

pub const TEAM_MEMBERS: ItemSchema = ItemSchema {
    prefix: "item",
    fields: &[
        ItemField::new("nom", ItemFieldType::String).required(),
        ItemField::new("prenoms", ItemFieldType::String).required(),
        ItemField::new("titres", ItemFieldType::Text),
        ItemField::new("email", ItemFieldType::Email),
        ItemField::new("cv", ItemFieldType::Document),
    ],
};

pub const PAST_DELIVERIES: ItemSchema = ItemSchema {
    prefix: "item",
    fields: &[
        ItemField::new("intitule", ItemFieldType::String).required(),
        ItemField::new("client", ItemFieldType::String).required(),
        ItemField::new("montant", ItemFieldType::Integer),
        ItemField::new("date_debut", ItemFieldType::Date),
        ItemField::new("date_fin", ItemFieldType::Date),
        ItemField::new("description", ItemFieldType::Text),
        ItemField::new("attestation", ItemFieldType::Document),
    ],
};

pub const SAMPLES: ItemSchema = ItemSchema {
    prefix: "item",
    fields: &[
        ItemField::new("nom", ItemFieldType::String).required(),
        ItemField::new("description", ItemFieldType::Text),
        ItemField::new("fichier", ItemFieldType::Document).required(),
    ],
};

pub const TURNOVER: YearlyTable = YearlyTable {
    fields: &[
        SlotField::new("turnover", SlotFieldKind::Amount),
        SlotField::new("market_percentage", SlotFieldKind::Percentage),
        SlotField::new("fiscal_year_end", SlotFieldKind::Date),
    ],
};

pub const WORKFORCE: YearlyTable = YearlyTable {
    fields: &[
        SlotField::new("year", SlotFieldKind::Year),
        SlotField::new("average_headcount", SlotFieldKind::Amount),
        SlotField::new("management_headcount", SlotFieldKind::Amount).optional(),
    ],
};

const TEXT: SchemaRule = SchemaRule::new(&["text"], "text").requiring(&["text"]);
const CHECKBOX: SchemaRule = SchemaRule::new(&["checked"], "value").requiring(&["checked"]);
const RADIO: SchemaRule =
    SchemaRule::new(&["radio_choice", "text"], "radio_choice").requiring(&["radio_choice"]);
const YEARLY: SchemaRule = SchemaRule::new(&YearlyTable::SLOT_KEYS, "value");
const REPEATABLE: SchemaRule = SchemaRule::new(&["items"], "value").requiring(&["items"]);

/// Schema declarations of all variant kinds.
pub const VARIANTS: &[VariantSpec] = &[
    VariantSpec::new(VariantKind::Text, TEXT),
    VariantSpec::new(VariantKind::Email, TEXT),
    VariantSpec::new(VariantKind::Phone, TEXT),
    VariantSpec::new(VariantKind::Url, TEXT),
    VariantSpec::new(VariantKind::Checkbox, CHECKBOX),
    VariantSpec::new(VariantKind::CheckboxWithDocument, CHECKBOX),
    // Documents only; the value stays empty.
    VariantSpec::new(VariantKind::FileUpload, SchemaRule::new(&[], "value")),
    VariantSpec::new(VariantKind::RadioWithFileAndText, RADIO),
    VariantSpec::new(VariantKind::RadioWithJustificationRequired, RADIO),
    VariantSpec::new(VariantKind::RadioWithJustificationOptional, RADIO),
    VariantSpec::new(VariantKind::FileOrTextarea, SchemaRule::new(&["text"], "value")),
    VariantSpec::new(VariantKind::YearlyTurnover, YEARLY).with_yearly(TURNOVER),
    VariantSpec::new(VariantKind::YearlyWorkforce, YEARLY).with_yearly(WORKFORCE),
    VariantSpec::new(VariantKind::TeamMembers, REPEATABLE).with_items(TEAM_MEMBERS),
    VariantSpec::new(VariantKind::PastDeliveries, REPEATABLE).with_items(PAST_DELIVERIES),
    VariantSpec::new(VariantKind::Samples, REPEATABLE).with_items(SAMPLES),
];

/// Look up the declaration of a variant kind.
pub fn get_spec(kind: VariantKind) -> Option<&'static VariantSpec> {
    VARIANTS.iter().find(|spec| spec.kind == kind)
}
