//! IR interchange document
//!
//! A serialisable snapshot of one pass: every symbol with its provenance,
//! dependencies and conversion status, plus the custom units the document
//! declared. Field order is the serialisation order.

use crate::symbols::{InternalId, Role, SymbolData, SymbolEntry, SymbolTable};
use calcmark_units::{Quantity, UnitExpr, UnitKind, UnitRegistry};
use serde::Serialize;

pub const IR_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrDocument {
    pub version: u32,
    pub symbols: Vec<IrSymbol>,
    pub units: Vec<IrUnit>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrQuantity {
    pub magnitude: f64,
    /// Unit in bracket syntax; `"1"` for dimensionless quantities.
    pub unit: String,
}

impl From<&Quantity> for IrQuantity {
    fn from(q: &Quantity) -> Self {
        Self {
            magnitude: q.magnitude,
            unit: q.unit_label(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrSymbol {
    pub internal_id: InternalId,
    pub display_name: String,
    pub role: Role,
    pub source_line: usize,
    pub original: Option<IrQuantity>,
    pub base: Option<IrQuantity>,
    pub conversion_ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Vec<InternalId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<InternalId>>,
    /// Owning formula of a parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula: Option<InternalId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrUnit {
    pub name: String,
    #[serde(serialize_with = "serialize_kind")]
    pub kind: UnitKind,
    /// Dimension in coherent base units, e.g. `kg*m^2/s^3`.
    pub dimension: String,
    pub scale_to_base: f64,
    pub display_form: String,
    pub defined_at_line: Option<usize>,
}

fn serialize_kind<S: serde::Serializer>(kind: &UnitKind, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(kind)
}

impl IrDocument {
    pub fn build(symbols: &SymbolTable, units: &UnitRegistry) -> Self {
        let symbols_out = symbols
            .entries()
            .map(|entry| IrSymbol::build(entry, units))
            .collect();
        let custom = units.custom_dimension_names();
        let units_out = units
            .custom_entries()
            .map(|entry| IrUnit {
                name: entry.name.clone(),
                kind: entry.kind,
                dimension: UnitExpr::atom(&entry.name, entry.dims.clone(), 1.0)
                    .base_form(custom)
                    .to_string(),
                scale_to_base: entry.scale_to_base,
                display_form: entry.display_form.clone(),
                defined_at_line: entry.defined_at_line,
            })
            .collect();
        Self {
            version: IR_VERSION,
            symbols: symbols_out,
            units: units_out,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn symbol(&self, display_name: &str) -> Option<&IrSymbol> {
        self.symbols
            .iter()
            .rev()
            .find(|s| s.display_name == display_name && s.role != Role::Parameter)
    }
}

impl IrSymbol {
    fn build(entry: &SymbolEntry, units: &UnitRegistry) -> Self {
        let mut out = IrSymbol {
            internal_id: entry.internal_id,
            display_name: entry.display_name.clone(),
            role: entry.role(),
            source_line: entry.source_line,
            original: None,
            base: None,
            conversion_ok: true,
            conversion_error: None,
            expression_summary: None,
            depends_on: None,
            parameters: None,
            formula: None,
        };
        match &entry.data {
            SymbolData::Value(v) => {
                out.original = Some((&v.original).into());
                out.base = v.base.as_ref().map(IrQuantity::from);
                out.conversion_ok = v.conversion_ok;
                out.conversion_error = v.conversion_error.clone();
            }
            SymbolData::Formula(f) => {
                out.original = f.result.as_ref().map(IrQuantity::from);
                out.base = f.result.as_ref().map(|q| (&units.to_base(q)).into());
                out.conversion_ok = f.error.is_none();
                out.conversion_error = f.error.as_ref().map(|e| format!("{}: {}", e.kind(), e));
                out.expression_summary = Some(f.expression_summary.clone());
                out.depends_on = Some(f.depends_on.clone());
                if f.is_function() {
                    out.parameters = Some(f.parameters.clone());
                }
            }
            SymbolData::Parameter { formula } => out.formula = *formula,
        }
        out
    }
}
