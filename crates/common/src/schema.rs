//! Field tables and flattening
//!
//! A record type declares its fields once, in order, as a static table of
//! [`Field`] entries. Each entry carries an accessor and one [`Policy`] per
//! [`View`]. Every consumer (CSV, name-value pairs, the legacy compact form
//! and the comparator) goes through [`flatten`], so adding, renaming or
//! excluding a field is a single table edit.
//!
//! Policies filter and rename; they never reorder. Declaration order is
//! iteration order.

/// Consumer of a flattened record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    /// Delimited two-row table
    Csv,
    /// `name:value` lines
    Nvp,
    /// Field-by-field comparison
    Compare,
    /// `host,serial` compact form
    Legacy,
}

/// What a view does with one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Emit under the declared name
    Keep,
    /// Emit under another name
    Rename(&'static str),
    /// Never emit
    Omit,
    /// Emit under the declared name unless the value is empty
    OmitEmpty,
    /// Emit under another name unless the value is empty
    RenameOmitEmpty(&'static str),
}

/// One entry of a record's field table
pub struct Field<R> {
    /// Declared name
    pub name: &'static str,
    /// Accessor rendering the field as a string
    pub value: fn(&R) -> String,
    csv: Policy,
    nvp: Policy,
    compare: Policy,
    legacy: Policy,
}

impl<R> Field<R> {
    /// A field kept under its declared name in every view
    pub fn new(name: &'static str, value: fn(&R) -> String) -> Self {
        Self {
            name,
            value,
            csv: Policy::Keep,
            nvp: Policy::Keep,
            compare: Policy::Keep,
            legacy: Policy::Keep,
        }
    }

    pub fn csv(mut self, policy: Policy) -> Self {
        self.csv = policy;
        self
    }

    pub fn nvp(mut self, policy: Policy) -> Self {
        self.nvp = policy;
        self
    }

    pub fn compare(mut self, policy: Policy) -> Self {
        self.compare = policy;
        self
    }

    pub fn legacy(mut self, policy: Policy) -> Self {
        self.legacy = policy;
        self
    }

    /// Shorthand for omitting the field from the CSV and NVP reports
    pub fn report_omit(self) -> Self {
        self.csv(Policy::Omit).nvp(Policy::Omit)
    }

    /// Policy applied to this field for `view`
    pub fn policy(&self, view: View) -> Policy {
        match view {
            View::Csv => self.csv,
            View::Nvp => self.nvp,
            View::Compare => self.compare,
            View::Legacy => self.legacy,
        }
    }
}

impl<R> std::fmt::Debug for Field<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("csv", &self.csv)
            .field("nvp", &self.nvp)
            .field("compare", &self.compare)
            .field("legacy", &self.legacy)
            .finish()
    }
}

/// A record type with a statically declared field table
pub trait Schema: Sized + 'static {
    /// Ordered field table, built once
    fn fields() -> &'static [Field<Self>];

    /// Tag identifying the schema a value was produced under
    ///
    /// Values with different tags are never comparable.
    fn schema_tag(&self) -> &str;
}

/// One (name, value) pair of a flattened record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatField {
    pub name: &'static str,
    pub value: String,
}

/// Flatten `record` into ordered (name, value) pairs for `view`
pub fn flatten<R: Schema>(record: &R, view: View) -> Vec<FlatField> {
    R::fields()
        .iter()
        .filter_map(|field| {
            let (name, skip_empty) = match field.policy(view) {
                Policy::Omit => return None,
                Policy::Keep => (field.name, false),
                Policy::Rename(name) => (name, false),
                Policy::OmitEmpty => (field.name, true),
                Policy::RenameOmitEmpty(name) => (name, true),
            };

            let value = (field.value)(record);
            if skip_empty && value.is_empty() {
                return None;
            }

            Some(FlatField { name, value })
        })
        .collect()
}
