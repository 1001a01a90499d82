//! Schema type definitions.

use crate::allocator::IdPolicy;
use crate::types::Kind;
use regex::Regex;
use serde_json::Value;

/// Value type of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// UTF-8 string.
    Text,
    /// Signed integer.
    Integer,
    /// Calendar date, persisted as `YYYY-MM-DD`.
    Date,
    /// One of a closed set of canonical spellings.
    Enum(&'static [&'static str]),
    /// Password-like value, persisted only as a salted hash.
    Secret,
}

impl FieldType {
    /// Returns the type name for error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Integer => "integer",
            FieldType::Date => "date",
            FieldType::Enum(_) => "enum",
            FieldType::Secret => "secret",
        }
    }
}

/// Canonical letter case applied to text before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Case {
    /// Keep as entered.
    #[default]
    Preserve,
    /// `MH12AB1234`
    Upper,
    /// `not ok`
    Lower,
    /// `Third Party`, `Blue-Collar`
    Title,
}

impl Case {
    /// Applies the case to `s`.
    #[must_use]
    pub fn apply(self, s: &str) -> String {
        match self {
            Case::Preserve => s.to_string(),
            Case::Upper => s.to_uppercase(),
            Case::Lower => s.to_lowercase(),
            Case::Title => {
                let mut out = String::with_capacity(s.len());
                let mut word_start = true;
                for ch in s.chars() {
                    if ch == ' ' || ch == '-' {
                        word_start = true;
                        out.push(ch);
                    } else if word_start {
                        out.extend(ch.to_uppercase());
                        word_start = false;
                    } else {
                        out.extend(ch.to_lowercase());
                    }
                }
                out
            }
        }
    }
}

/// Per-field content rule.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Whole value must match the pattern.
    Pattern {
        /// Compiled, anchored pattern.
        regex: Regex,
        /// Example or description shown in the rejection reason.
        hint: &'static str,
    },
    /// Must contain a non-whitespace character.
    NonEmpty,
    /// Date must not lie after today.
    NotFuture,
    /// Password strength policy.
    Password,
}

/// Restricts a foreign key to target records with a given role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleFilter {
    /// Field on the target record.
    pub field: &'static str,
    /// Required value, compared case-insensitively.
    pub value: &'static str,
}

/// A foreign key into another kind's collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Kind the field points into.
    pub target: Kind,
    /// Optional role restriction on the target.
    pub role: Option<RoleFilter>,
}

/// Field declaration.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Field name as persisted.
    pub name: &'static str,
    /// Value type.
    pub field_type: FieldType,
    /// Must be present after defaults and derivations.
    pub required: bool,
    /// Explicit `null` allowed.
    pub nullable: bool,
    /// Backfilled on load and applied on create when absent.
    pub default: Option<Value>,
    /// Canonical case for text values.
    pub case: Case,
    /// Content rule.
    pub rule: Option<Rule>,
    /// No two records of the kind share a value.
    pub unique: bool,
    /// Foreign key target.
    pub reference: Option<Reference>,
    /// Computed by the store; callers may not set it.
    pub derived: bool,
    /// Legacy key names migrated to `name` on load.
    pub aliases: &'static [&'static str],
}

impl FieldSpec {
    /// Creates a required field of the given type.
    #[must_use]
    pub fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: true,
            nullable: false,
            default: None,
            case: Case::Preserve,
            rule: None,
            unique: false,
            reference: None,
            derived: false,
            aliases: &[],
        }
    }

    /// Shorthand for a required text field.
    #[must_use]
    pub fn text(name: &'static str) -> Self {
        Self::new(name, FieldType::Text)
    }

    /// Shorthand for a required date field.
    #[must_use]
    pub fn date(name: &'static str) -> Self {
        Self::new(name, FieldType::Date)
    }

    /// Shorthand for a required enumerated field.
    #[must_use]
    pub fn one_of(name: &'static str, values: &'static [&'static str], case: Case) -> Self {
        Self::new(name, FieldType::Enum(values)).case(case)
    }

    /// Makes the field optional and nullable.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self.nullable = true;
        self
    }

    /// Sets the backfill default.
    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Sets the canonical case.
    #[must_use]
    pub fn case(mut self, case: Case) -> Self {
        self.case = case;
        self
    }

    /// Sets the content rule.
    #[must_use]
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rule = Some(rule);
        self
    }

    /// Requires values to be unique within the kind.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Declares a foreign key.
    #[must_use]
    pub fn references(mut self, target: Kind, role: Option<RoleFilter>) -> Self {
        self.reference = Some(Reference { target, role });
        self
    }

    /// Marks the field as computed by the store.
    #[must_use]
    pub fn derived(mut self) -> Self {
        self.derived = true;
        self
    }

    /// Sets legacy key names.
    #[must_use]
    pub fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }
}

/// How a derived expiry date is computed from the issue date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryRule {
    /// Same calendar day `n` years later (Feb 29 clamps to Feb 28).
    CalendarYears(u32),
    /// A fixed number of days later.
    Days(u64),
}

/// Validity window of a kind with a lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lifecycle {
    /// Issue date field.
    pub issued: &'static str,
    /// Expiry date field.
    pub expires: &'static str,
    /// Cached status field.
    pub status: &'static str,
    /// How expiry follows from issue.
    pub validity: ExpiryRule,
}

/// Value computed by the store on every write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Derivation {
    /// Expiry date and status from the lifecycle window.
    Lifecycle,
    /// Age in whole years from a date of birth, when the birth date is set.
    AgeFromBirthDate {
        /// Date of birth field.
        birth: &'static str,
        /// Age field.
        age: &'static str,
    },
    /// Display name copied from the referenced record.
    ReferenceName {
        /// Foreign-key field.
        id_field: &'static str,
        /// Field receiving the name.
        name_field: &'static str,
        /// Name field on the referenced record.
        source_field: &'static str,
        /// Value used when the reference is empty.
        unassigned: &'static str,
    },
    /// Resets `field` to an empty string unless `when_field` equals `equals`.
    ClearUnless {
        /// Field to clear.
        field: &'static str,
        /// Controlling field.
        when_field: &'static str,
        /// Value of the controlling field that keeps `field`.
        equals: &'static str,
    },
}

/// Constraint spanning several fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrossCheck {
    /// Age must fall in the range allowed for the position.
    AgeForPosition {
        /// Age field.
        age: &'static str,
        /// Position field.
        position: &'static str,
    },
    /// `field` must be non-empty when `when_field` equals `equals`.
    RequiredWhen {
        /// Field that becomes required.
        field: &'static str,
        /// Controlling field.
        when_field: &'static str,
        /// Triggering value of the controlling field.
        equals: &'static str,
    },
}

/// Layout of a kind's backing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentShape {
    /// `[ {id_field: id, ...}, ... ]`
    Array,
    /// `{ id: {...}, ... }`
    Map,
}

/// Complete description of one record kind.
#[derive(Debug, Clone)]
pub struct Schema {
    /// The kind described.
    pub kind: Kind,
    /// Primary key field name.
    pub id_field: &'static str,
    /// Legacy names of the primary key field.
    pub id_aliases: &'static [&'static str],
    /// How new ids are produced.
    pub id_policy: IdPolicy,
    /// Document layout.
    pub shape: DocumentShape,
    /// Fields in persisted order, excluding the id.
    pub fields: Vec<FieldSpec>,
    /// Cross-field constraints, checked after per-field rules.
    pub checks: Vec<CrossCheck>,
    /// Store-computed values, applied in order.
    pub derivations: Vec<Derivation>,
    /// Validity window, if the kind expires.
    pub lifecycle: Option<Lifecycle>,
}

impl Schema {
    /// Looks up a field declaration.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether `name` is the id field or a declared field.
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        name == self.id_field || self.field(name).is_some()
    }

    /// Fields that are foreign keys, with their targets.
    pub fn references(&self) -> impl Iterator<Item = (&FieldSpec, &Reference)> {
        self.fields
            .iter()
            .filter_map(|f| f.reference.as_ref().map(|r| (f, r)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_case_handles_separators() {
        assert_eq!(Case::Title.apply("blue-collar"), "Blue-Collar");
        assert_eq!(Case::Title.apply("ZERO depreciation"), "Zero Depreciation");
        assert_eq!(Case::Title.apply("male"), "Male");
    }

    #[test]
    fn upper_and_lower_case() {
        assert_eq!(Case::Upper.apply("mh12ab1234"), "MH12AB1234");
        assert_eq!(Case::Lower.apply("Not OK"), "not ok");
        assert_eq!(Case::Preserve.apply("Asha K"), "Asha K");
    }

    #[test]
    fn optional_implies_nullable() {
        let spec = FieldSpec::text("driver_id").optional();
        assert!(!spec.required);
        assert!(spec.nullable);
    }

    #[test]
    fn field_type_names() {
        assert_eq!(FieldType::Text.type_name(), "text");
        assert_eq!(FieldType::Integer.type_name(), "integer");
        assert_eq!(FieldType::Date.type_name(), "date");
        assert_eq!(FieldType::Enum(&["a"]).type_name(), "enum");
        assert_eq!(FieldType::Secret.type_name(), "secret");
    }
}
