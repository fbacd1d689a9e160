use crate::store::{MemStore, StoredNode};
use common::schemata::Table;
use common::{ArborError, DataType, Field};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Parses one CSV value as the column's type. An empty value is null.
fn parse_field(value: &str, dtype: DataType) -> Result<Field, ArborError> {
    if value.is_empty() {
        return Ok(Field::Null);
    }
    let invalid = |e: &dyn std::fmt::Display| {
        ArborError::ValidationError(format!("Cannot read {:?} as {:?}: {}", value, dtype, e))
    };
    match dtype {
        DataType::Long | DataType::Date => value
            .trim()
            .parse::<i64>()
            .map(Field::LongField)
            .map_err(|e| invalid(&e)),
        DataType::Double => value
            .trim()
            .parse::<f64>()
            .map(Field::DoubleField)
            .map_err(|e| invalid(&e)),
        DataType::Boolean => value
            .trim()
            .parse::<bool>()
            .map(Field::BooleanField)
            .map_err(|e| invalid(&e)),
        DataType::String | DataType::Path | DataType::Name => Ok(Field::from(value)),
    }
}

/// Imports CSV data as nodes of a table.
///
/// Each record becomes a node of the table's type at `/<table>/<row number>`; values are
/// matched to the table's declared columns by position.
///
/// # Arguments
///
/// * `store` - Store receiving the nodes.
/// * `table` - Table the records belong to.
/// * `reader` - CSV source.
/// * `has_headers` - Skip the first record.
pub fn import_csv_from_reader<R: Read>(
    store: &MemStore,
    table: &Table,
    reader: R,
    has_headers: bool,
) -> Result<usize, ArborError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(has_headers)
        .from_reader(reader);
    let columns: Vec<_> = table.columns().cloned().collect();
    let mut inserted_records = 0;
    for (i, result) in rdr.records().enumerate() {
        let rec = result.map_err(|e| ArborError::IOError(e.to_string()))?;
        if rec.len() > columns.len() {
            return Err(ArborError::ValidationError(format!(
                "Record {} has {} values but {} has {} columns",
                i + 1,
                rec.len(),
                table.name(),
                columns.len()
            )));
        }
        let mut node = StoredNode::new(format!("/{}/{}", table.name(), i + 1), table.name().name());
        for (value, column) in rec.iter().zip(columns.iter()) {
            let field = parse_field(value, column.dtype)?;
            if !field.is_null() {
                node.properties.insert(column.name.clone(), field);
            }
        }
        store.add_node(node)?;
        inserted_records += 1;
    }
    info!("Num records imported into {}: {:?}", table.name(), inserted_records);
    Ok(inserted_records)
}

/// Imports a CSV file as nodes of a table; see [`import_csv_from_reader`].
pub fn import_csv(
    store: &MemStore,
    table: &Table,
    path: impl AsRef<Path>,
    has_headers: bool,
) -> Result<usize, ArborError> {
    debug!("memstore trying to open csv file {:?}", path.as_ref());
    let file = File::open(path)?;
    import_csv_from_reader(store, table, file, has_headers)
}

#[cfg(test)]
mod test {
    use super::*;
    use common::testutil::cars_schemata;
    use common::schemata::Schemata;
    use common::SelectorName;

    #[test]
    fn test_import() {
        let schemata = cars_schemata();
        let table = schemata.table(&SelectorName::new("cars")).unwrap();
        let store = MemStore::new();
        let data = "maker,model,year,msrp\nHonda,Civic,2004,18000.5\nFord,Model T,,850\n";
        let count = import_csv_from_reader(&store, table, data.as_bytes(), true).unwrap();
        assert_eq!(count, 2);
        let civic = store.node("/cars/1").unwrap();
        assert_eq!(civic.node_type, "cars");
        assert_eq!(civic.properties["year"], Field::LongField(2004));
        assert_eq!(civic.properties["msrp"], Field::DoubleField(18000.5));
        assert!(!store.node("/cars/2").unwrap().properties.contains_key("year"));
    }

    #[test]
    fn test_bad_values() {
        let schemata = cars_schemata();
        let table = schemata.table(&SelectorName::new("cars")).unwrap();
        let store = MemStore::new();
        let data = "Honda,Civic,new,1\n";
        assert!(import_csv_from_reader(&store, table, data.as_bytes(), false).is_err());
        let data = "Honda,Civic,2004,1,extra\n";
        assert!(import_csv_from_reader(&store, table, data.as_bytes(), false).is_err());
    }

    #[test]
    fn test_missing_file() {
        let schemata = cars_schemata();
        let table = schemata.table(&SelectorName::new("cars")).unwrap();
        assert!(import_csv(&MemStore::new(), table, "/no/such/file.csv", false).is_err());
    }
}
