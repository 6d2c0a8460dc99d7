use std::io::Read;

use rusqlite::Connection;
use serde::Deserialize;
use tracing::info;

use crate::db;
use crate::error::EtlError;

#[derive(Debug, Deserialize)]
struct RelationRecord {
    product: String,
    location: String,
}

#[derive(Debug, Deserialize)]
struct LocationRecord {
    id: String,
    number: String,
    street: String,
    city: String,
    state: String,
}

/// Load "product,location" pairs from a CSV stream with a header row.
/// One insert per data row, committed as it lands; a row that cannot be
/// mapped onto the expected columns aborts the remaining rows.
pub fn load_relations(conn: &Connection, input: impl Read) -> Result<usize, EtlError> {
    let mut reader = csv::Reader::from_reader(input);
    let mut count = 0;
    for record in reader.deserialize() {
        let r: RelationRecord = record?;
        db::insert_relation(conn, &r.product, &r.location)?;
        count += 1;
    }
    info!("loaded {} relations", count);
    Ok(count)
}

/// Load "id,number,street,city,state" rows from a CSV stream with a
/// header row. Same row-at-a-time commit discipline as the relations.
pub fn load_locations(conn: &Connection, input: impl Read) -> Result<usize, EtlError> {
    let mut reader = csv::Reader::from_reader(input);
    let mut count = 0;
    for record in reader.deserialize() {
        let r: LocationRecord = record?;
        db::insert_location(conn, &r.id, &r.number, &r.street, &r.city, &r.state)?;
        count += 1;
    }
    info!("loaded {} locations", count);
    Ok(count)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn relations_one_record_per_data_row() {
        let conn = memory_db();
        let csv = "product,location\n0,1\n1,2\n0,2\n";
        let n = load_relations(&conn, Cursor::new(csv)).unwrap();
        assert_eq!(n, 3);
        assert_eq!(db::get_stats(&conn).unwrap().relations, 3);
    }

    #[test]
    fn locations_one_record_per_data_row() {
        let conn = memory_db();
        let csv = "id,number,street,city,state\n\
                   1,12,Main St,Sydney,NSW\n\
                   2,201,George St,Sydney,NSW\n";
        let n = load_locations(&conn, Cursor::new(csv)).unwrap();
        assert_eq!(n, 2);
        assert_eq!(db::get_stats(&conn).unwrap().locations, 2);
    }

    #[test]
    fn header_only_input_loads_nothing() {
        let conn = memory_db();
        let n = load_relations(&conn, Cursor::new("product,location\n")).unwrap();
        assert_eq!(n, 0);
        let stats = db::get_stats(&conn).unwrap();
        assert_eq!(stats.relations, 0);
        assert_eq!(stats.locations, 0);
        assert_eq!(stats.products, 0);
    }

    #[test]
    fn missing_column_is_a_parse_error() {
        let conn = memory_db();
        let csv = "product,store\n0,1\n";
        let err = load_relations(&conn, Cursor::new(csv)).unwrap_err();
        assert!(matches!(err, EtlError::Parse(_)));
        assert_eq!(db::get_stats(&conn).unwrap().relations, 0);
    }

    #[test]
    fn bad_row_keeps_the_committed_prefix() {
        let conn = memory_db();
        // Third data row has the wrong field count.
        let csv = "product,location\n0,1\n1,2\nbroken\n";
        let err = load_relations(&conn, Cursor::new(csv)).unwrap_err();
        assert!(matches!(err, EtlError::Parse(_)));
        assert_eq!(db::get_stats(&conn).unwrap().relations, 2);
    }

    #[test]
    fn column_order_follows_header_names() {
        let conn = memory_db();
        let csv = "location,product\nL9,P7\n";
        load_relations(&conn, Cursor::new(csv)).unwrap();
        let (product, location): (String, String) = conn
            .query_row("SELECT product, location FROM relations", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(product, "P7");
        assert_eq!(location, "L9");
    }
}
