use std::collections::HashMap;
use std::sync::Arc;

use tabula_api::column_type::ColumnType;
use tabula_api::error::{ConstructionError, TypeError};
use tabula_api::schema::{FieldDescriptor, FieldRole, Representation};
use tabula_api::target::Target;
use tabula_api::value::{RowSet, Scalar, Value};

use crate::error::EngineError;
use crate::registry::TypeRegistry;

/// How an attribute column is turned into field values.
enum Coercion<'r> {
    /// The resolved type produces the field's representation itself.
    Typed(&'r dyn ColumnType),
    /// Text field over a type without a text form: use the primary column's raw text.
    RawText,
}

/// Row set → target instances.
///
/// Population is synchronous; the registry is only read.
#[derive(Debug, Clone)]
pub struct Mapper {
    registry: Arc<TypeRegistry>,
}

impl Mapper {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Populate one `T` per row using its derived descriptors.
    ///
    /// `Ok(None)` means "no data": `rows` is absent or empty.
    pub fn populate<T: Target>(&self, rows: Option<&RowSet>) -> Result<Option<Vec<T>>, EngineError> {
        self.populate_with(rows, T::fields(), T::construct)
    }

    /// Populate with explicit descriptors and constructor.
    ///
    /// - identity fields get the 0-based row index
    /// - attribute fields whose column is missing from the example row, or
    ///   whose resolved type cannot produce the field's representation, are
    ///   left at their default
    /// - a row lacking the column (or holding `null`) leaves that instance's
    ///   field at its default
    pub fn populate_with<T, C>(
        &self,
        rows: Option<&RowSet>,
        fields: &[FieldDescriptor],
        mut construct: C,
    ) -> Result<Option<Vec<T>>, EngineError>
    where
        T: Target,
        C: FnMut() -> Result<T, ConstructionError>,
    {
        let Some(rows) = rows.filter(|r| !r.is_empty()) else {
            return Ok(None);
        };
        check_shape(fields)?;

        let mut instances = (0..rows.len())
            .map(|_| construct())
            .collect::<Result<Vec<T>, _>>()?;

        for field in fields {
            match field.role {
                FieldRole::Identity => {
                    for (index, instance) in instances.iter_mut().enumerate() {
                        instance.assign_identity(field.name, index)?;
                    }
                }
                FieldRole::Attribute {
                    column,
                    representation,
                } => self.populate_attribute(rows, field.name, column, representation, &mut instances)?,
            }
        }

        Ok(Some(instances))
    }

    fn populate_attribute<T: Target>(
        &self,
        rows: &RowSet,
        field: &str,
        column: &str,
        representation: Representation,
        instances: &mut [T],
    ) -> Result<(), EngineError> {
        let Some(example_row) = rows.example_row().filter(|r| r.contains(column)) else {
            tracing::debug!(field, column, "column absent from result, field left unset");
            return Ok(());
        };

        let column_type = self.registry.resolve(example_row, column);
        let coercion = if column_type.supports(representation) {
            Coercion::Typed(column_type)
        } else if representation == Representation::Text {
            Coercion::RawText
        } else {
            tracing::debug!(
                field,
                column,
                column_type = column_type.name(),
                %representation,
                "incompatible column type, field left unset"
            );
            return Ok(());
        };

        for (index, (row, instance)) in rows.iter().zip(instances.iter_mut()).enumerate() {
            let raw = match row.get(column) {
                None | Some(Scalar::Null) => continue,
                Some(raw) => raw,
            };

            let value = match &coercion {
                Coercion::Typed(column_type) => column_type
                    .value_as(row, column, representation)
                    .map_err(|e| coercion_error(e, index, column))?,
                Coercion::RawText => Value::Text(raw.to_text()),
            };
            instance.assign(field, value)?;
        }

        Ok(())
    }
}

fn coercion_error(e: TypeError, row: usize, column: &str) -> EngineError {
    match e {
        TypeError::UnsupportedRepresentation {
            type_name,
            representation,
        } => EngineError::UnsupportedRepresentation {
            type_name,
            column: column.to_string(),
            representation,
        },
        source => EngineError::Coercion {
            row,
            column: column.to_string(),
            source,
        },
    }
}

/// A field may not be both the identity and an attribute.
fn check_shape(fields: &[FieldDescriptor]) -> Result<(), EngineError> {
    let mut roles: HashMap<&str, bool> = HashMap::new();
    for field in fields {
        let is_identity = field.is_identity();
        if let Some(seen) = roles.insert(field.name, is_identity) {
            if seen != is_identity {
                return Err(EngineError::InvalidShape(format!(
                    "field '{}' is declared both as identity and as attribute",
                    field.name
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_api::error::AssignmentError;
    use tabula_api::value::{Money, Row};

    #[derive(Debug, Default, tabula_api::Target)]
    struct Product {
        #[id]
        id: u64,
        #[attribute("name")]
        name: String,
        #[attribute("price")]
        price: Option<Money>,
        #[attribute("price")]
        price_label: String,
        #[attribute("seen")]
        seen_ms: i64,
        #[attribute("name")]
        name_as_number: f64,
    }

    fn mapper() -> Mapper {
        Mapper::new(Arc::new(TypeRegistry::classic()))
    }

    fn product_rows() -> RowSet {
        RowSet::new(vec![
            Row::new()
                .with("name", "Desk lamp")
                .with("price", 20.3)
                .with("price/_currency", "USD")
                .with("price/_source", "$20.30")
                .with("seen", 1_000_000_000_000i64)
                .with("seen/_utc", "2001-09-09T01:46:40Z")
                .with("seen/_source", "Sep 9"),
            Row::new()
                .with("name", "Chair")
                .with("price", 45i64)
                .with("price/_currency", "EUR")
                .with("price/_source", "45 €")
                .with("seen", 0i64)
                .with("seen/_utc", "1970-01-01T00:00:00Z")
                .with("seen/_source", "long ago"),
        ])
    }

    #[test]
    fn test_populates_one_instance_per_row() {
        let products: Vec<Product> = mapper().populate(Some(&product_rows())).unwrap().unwrap();
        assert_eq!(products.len(), 2);

        assert_eq!(products[0].id, 0);
        assert_eq!(products[0].name, "Desk lamp");
        assert_eq!(products[0].price_label, "$20.30");
        assert_eq!(products[0].seen_ms, 1_000_000_000_000);
        let price = products[0].price.as_ref().unwrap();
        assert_eq!(price.currency().as_str(), "USD");
        assert_eq!(price.amount().to_string(), "20.3");

        assert_eq!(products[1].id, 1);
        assert_eq!(products[1].name, "Chair");
        assert_eq!(products[1].price.as_ref().unwrap().currency().as_str(), "EUR");
    }

    #[test]
    fn test_incompatible_field_is_skipped() {
        let products: Vec<Product> = mapper().populate(Some(&product_rows())).unwrap().unwrap();
        // `name` resolves to string, which has no number form.
        assert!(products.iter().all(|p| p.name_as_number == 0.0));
    }

    #[test]
    fn test_no_data_is_none() {
        assert!(mapper().populate::<Product>(None).unwrap().is_none());
        assert!(mapper().populate::<Product>(Some(&RowSet::empty())).unwrap().is_none());
    }

    #[test]
    fn test_row_missing_column_keeps_default() {
        let rows = RowSet::new(vec![
            Row::new().with("name", "first"),
            Row::new(),
            Row::new().with("name", Scalar::Null),
        ]);
        let products: Vec<Product> = mapper().populate(Some(&rows)).unwrap().unwrap();
        assert_eq!(products.len(), 3);
        assert_eq!(products[0].name, "first");
        assert_eq!(products[1].name, "");
        assert_eq!(products[2].name, "");
        assert_eq!(products[2].id, 2);
    }

    #[test]
    fn test_raw_text_fallback() {
        struct Opaque;

        impl ColumnType for Opaque {
            fn name(&self) -> &'static str {
                "opaque"
            }
            fn representations(&self) -> &'static [Representation] {
                &[Representation::Number]
            }
            fn is_column_of_type(&self, row: &Row, column: &str) -> bool {
                row.contains(&format!("{column}/_opaque"))
            }
            fn value_as(&self, _: &Row, _: &str, _: Representation) -> Result<Value, TypeError> {
                Ok(Value::Number(-1.0))
            }
        }

        let mut registry = TypeRegistry::classic();
        registry.register(Arc::new(Opaque));
        let mapper = Mapper::new(Arc::new(registry));

        let rows = RowSet::new(vec![Row::new().with("name", 7i64).with("name/_opaque", true)]);
        let products: Vec<Product> = mapper.populate(Some(&rows)).unwrap().unwrap();
        assert_eq!(products[0].name, "7");
        assert_eq!(products[0].name_as_number, -1.0);
    }

    #[test]
    fn test_construction_failure_propagates() {
        let err = mapper()
            .populate_with::<Product, _>(Some(&product_rows()), Product::fields(), || {
                Err(ConstructionError::new("Product", "no memory"))
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::Construction(_)));
    }

    #[test]
    fn test_mixed_roles_rejected() {
        const FIELDS: &[FieldDescriptor] = &[
            FieldDescriptor::identity("id"),
            FieldDescriptor::attribute("id", "id", Representation::Text),
        ];
        let err = mapper()
            .populate_with(Some(&product_rows()), FIELDS, Product::construct)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidShape(_)));
    }

    #[test]
    fn test_lying_type_fails_fast() {
        struct Liar;

        impl ColumnType for Liar {
            fn name(&self) -> &'static str {
                "liar"
            }
            fn representations(&self) -> &'static [Representation] {
                &[Representation::Money]
            }
            fn is_column_of_type(&self, _: &Row, _: &str) -> bool {
                true
            }
            fn value_as(&self, _: &Row, _: &str, _: Representation) -> Result<Value, TypeError> {
                Ok(Value::Text("not money".into()))
            }
        }

        let mapper = Mapper::new(Arc::new(TypeRegistry::new(Arc::new(Liar))));

        const FIELDS: &[FieldDescriptor] =
            &[FieldDescriptor::attribute("price", "name", Representation::Money)];
        let err = mapper
            .populate_with(Some(&product_rows()), FIELDS, Product::construct)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Assignment(AssignmentError { ref field, .. }) if field == "price"
        ));
    }
}
