// Wire model of the service's `analyzeResult` payload.
//
// Every attribute the service may leave out is an `Option` (or defaults to
// zero), and `null` is read the same as absent, so a sparse response
// deserializes cleanly and the flattener can match on presence.

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::Number;
use std::fmt;

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisResult {
    pub api_version: Option<String>,
    pub model_id: Option<String>,
    pub content: Option<String>,
    #[serde(deserialize_with = "skip_nulls")]
    pub pages: Option<Vec<Page>>,
    #[serde(deserialize_with = "skip_nulls")]
    pub tables: Option<Vec<Table>>,
    #[serde(deserialize_with = "skip_nulls")]
    pub documents: Option<Vec<AnalyzedDocument>>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Page {
    pub page_number: Option<u32>,
    #[serde(deserialize_with = "skip_nulls")]
    pub lines: Option<Vec<Line>>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Line {
    pub content: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Table {
    #[serde(deserialize_with = "null_as_zero")]
    pub row_count: usize,
    #[serde(deserialize_with = "null_as_zero")]
    pub column_count: usize,
    #[serde(deserialize_with = "skip_nulls")]
    pub cells: Option<Vec<TableCell>>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TableCell {
    #[serde(deserialize_with = "null_as_zero")]
    pub row_index: usize,
    #[serde(deserialize_with = "null_as_zero")]
    pub column_index: usize,
    pub content: Option<String>,
    pub confidence: Option<f64>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyzedDocument {
    pub doc_type: Option<String>,
    pub confidence: Option<f64>,
    pub fields: Option<FieldMap>,
}

/// Named fields in the order the service sent them.
///
/// JSON objects are read entry by entry into a `Vec`, so iteration order is
/// arrival order and never depends on hashing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap(pub Vec<(String, DocumentField)>);

impl FieldMap {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DocumentField)> {
        self.0.iter().map(|(name, field)| (name.as_str(), field))
    }
}

impl<'de> Deserialize<'de> for FieldMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FieldMapVisitor;

        impl<'de> Visitor<'de> for FieldMapVisitor {
            type Value = FieldMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of field names to document fields")
            }

            fn visit_map<A>(self, mut access: A) -> Result<FieldMap, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                // A `null` field is the same as a missing one.
                while let Some((name, field)) =
                    access.next_entry::<String, Option<DocumentField>>()?
                {
                    if let Some(field) = field {
                        entries.push((name, field));
                    }
                }
                Ok(FieldMap(entries))
            }
        }

        deserializer.deserialize_map(FieldMapVisitor)
    }
}

/// One extracted field. At most one `value*` slot is normally populated,
/// matching the declared `type`.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentField {
    #[serde(rename = "type")]
    pub field_type: Option<String>,
    pub content: Option<String>,
    pub confidence: Option<f64>,
    pub value_string: Option<String>,
    pub value_date: Option<String>,
    pub value_time: Option<String>,
    pub value_phone_number: Option<String>,
    pub value_country_region: Option<String>,
    pub value_selection_mark: Option<String>,
    pub value_signature: Option<String>,
    pub value_number: Option<Number>,
    pub value_integer: Option<i64>,
    pub value_boolean: Option<bool>,
    pub value_currency: Option<CurrencyValue>,
    pub value_address: Option<AddressValue>,
    #[serde(deserialize_with = "skip_nulls")]
    pub value_array: Option<Vec<DocumentField>>,
    pub value_object: Option<FieldMap>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CurrencyValue {
    pub amount: Option<Number>,
    pub currency_symbol: Option<String>,
    pub currency_code: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressValue {
    pub house_number: Option<String>,
    pub po_box: Option<String>,
    pub road: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country_region: Option<String>,
    pub street_address: Option<String>,
}

fn skip_nulls<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let items: Option<Vec<Option<T>>> = Option::deserialize(deserializer)?;
    Ok(items.map(|items| items.into_iter().flatten().collect()))
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<usize>::deserialize(deserializer)?.unwrap_or_default())
}

/// Borrowed view of whichever typed value a field carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Number(&'a Number),
    Integer(i64),
    Boolean(bool),
    Currency(&'a CurrencyValue),
    Address(&'a AddressValue),
    Array(&'a [DocumentField]),
    Object(&'a FieldMap),
}

impl DocumentField {
    /// The typed value, if the service supplied one.
    pub fn value(&self) -> Option<FieldValue<'_>> {
        let text = [
            &self.value_string,
            &self.value_date,
            &self.value_time,
            &self.value_phone_number,
            &self.value_country_region,
            &self.value_selection_mark,
            &self.value_signature,
        ]
        .into_iter()
        .find_map(|slot| slot.as_deref());
        if let Some(s) = text {
            return Some(FieldValue::Text(s));
        }
        if let Some(n) = &self.value_number {
            return Some(FieldValue::Number(n));
        }
        if let Some(i) = self.value_integer {
            return Some(FieldValue::Integer(i));
        }
        if let Some(b) = self.value_boolean {
            return Some(FieldValue::Boolean(b));
        }
        if let Some(c) = &self.value_currency {
            return Some(FieldValue::Currency(c));
        }
        if let Some(a) = &self.value_address {
            return Some(FieldValue::Address(a));
        }
        if let Some(items) = &self.value_array {
            return Some(FieldValue::Array(items));
        }
        self.value_object.as_ref().map(FieldValue::Object)
    }

    /// Typed value rendered as text, else the raw `content`, else empty.
    pub fn display_value(&self) -> String {
        match self.value() {
            Some(value) => value.to_string(),
            None => self.content.clone().unwrap_or_default(),
        }
    }
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Boolean(b) => write!(f, "{}", b),
            FieldValue::Currency(c) => {
                if let Some(symbol) = &c.currency_symbol {
                    f.write_str(symbol)?;
                }
                match &c.amount {
                    Some(amount) => write!(f, "{}", amount),
                    None => Ok(()),
                }
            }
            FieldValue::Address(a) => f.write_str(&a.one_line()),
            FieldValue::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(&item.display_value())?;
                }
                f.write_str("]")
            }
            FieldValue::Object(map) => {
                f.write_str("{")?;
                for (i, (name, field)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", name, field.display_value())?;
                }
                f.write_str("}")
            }
        }
    }
}

impl AddressValue {
    /// Postal-order single line: street, city, state + postal code, country.
    pub fn one_line(&self) -> String {
        let street = join_present(&[&self.house_number, &self.road], " ")
            .or_else(|| self.street_address.clone())
            .or_else(|| self.po_box.clone());
        let region = join_present(&[&self.state, &self.postal_code], " ");
        [street, self.city.clone(), region, self.country_region.clone()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn join_present(parts: &[&Option<String>], sep: &str) -> Option<String> {
    let present: Vec<&str> = parts
        .iter()
        .filter_map(|p| p.as_deref())
        .filter(|s| !s.is_empty())
        .collect();
    if present.is_empty() {
        None
    } else {
        Some(present.join(sep))
    }
}
