mod common;

use common::{day, records};
use pretty_assertions::assert_eq;
use price_forecast::data::{PriceRecord, RawPriceLoader};
use price_forecast::{ForecastError, PriceSeries, SegmentKey, SegmentStore};
use std::fs;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

#[test]
fn test_ingest_is_idempotent() {
    let dir = tempdir().unwrap();
    let store = SegmentStore::new(dir.path());
    let key = SegmentKey::new("Madrid", "Gasóleo A");
    let batch = records(
        &key,
        &[
            (day("2024-01-02"), 1.52),
            (day("2024-01-01"), 1.50),
            (day("2024-01-03"), 1.55),
        ],
    );

    store.ingest(&batch).unwrap();
    let path = store.segment_dir(&key).join("original.csv");
    let first = fs::read_to_string(&path).unwrap();

    store.ingest(&batch).unwrap();
    let second = fs::read_to_string(&path).unwrap();

    assert_eq!(first, second);
    assert!(first.starts_with("Fecha,Precio\n"));
    assert_eq!(store.load(&key).unwrap().len(), 3);
}

#[test]
fn test_ingest_merges_with_last_write_wins() {
    let dir = tempdir().unwrap();
    let store = SegmentStore::new(dir.path());
    let key = SegmentKey::new("Madrid", "Gasóleo A");

    store
        .ingest(&records(&key, &[(day("2024-01-01"), 1.50), (day("2024-01-02"), 1.52)]))
        .unwrap();
    store
        .ingest(&records(
            &key,
            &[
                (day("2024-01-02"), 1.60),
                (day("2024-01-03"), 1.61),
                (day("2024-01-03"), 1.62),
            ],
        ))
        .unwrap();

    let series = store.load(&key).unwrap();
    assert_eq!(
        series,
        PriceSeries::new(
            vec![day("2024-01-01"), day("2024-01-02"), day("2024-01-03")],
            vec![1.50, 1.60, 1.62]
        )
        .unwrap()
    );
}

#[test]
fn test_segments_are_sorted() {
    let dir = tempdir().unwrap();
    let store = SegmentStore::new(dir.path());
    let rows: Vec<PriceRecord> = [("Zaragoza", "Gasóleo A"), ("Ávila", "Gasolina 95 E5"), ("Madrid", "Gasóleo A"), ("Madrid", "Gasolina 95 E5")]
        .iter()
        .map(|(province, product)| PriceRecord {
            date: day("2024-01-01"),
            key: SegmentKey::new(province, product),
            price: 1.5,
        })
        .collect();

    let updated = store.ingest(&rows).unwrap();
    let listed = store.segments().unwrap();

    assert_eq!(updated, listed);
    let mut sorted = listed.clone();
    sorted.sort();
    assert_eq!(listed, sorted);
    assert_eq!(listed.len(), 4);
}

#[test]
fn test_raw_export_is_cleaned_and_segmented() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Fecha Precio;Provincia;Producto;Promedio de Pvp Diario CUBO €/litro").unwrap();
    writeln!(file, "01/01/2024;Alicante/Alacant;Gasóleo A;1,529").unwrap();
    writeln!(file, "02/01/2024;Alicante/Alacant;Gasóleo A;1,531").unwrap();
    writeln!(file, "fecha rota;Alicante/Alacant;Gasóleo A;1,531").unwrap();
    writeln!(file, "03/01/2024;Madrid;Gasolina 95 E5;sin dato").unwrap();
    writeln!(file, "03/01/2024;Madrid;Gasolina 95 E5;1,649").unwrap();
    file.flush().unwrap();

    let dir = tempdir().unwrap();
    let store = SegmentStore::new(dir.path());
    let updated = store.ingest_file(file.path(), &RawPriceLoader::new()).unwrap();

    assert_eq!(
        updated,
        vec![
            SegmentKey::new("Alicante", "Gasóleo A"),
            SegmentKey::new("Madrid", "Gasolina 95 E5"),
        ]
    );
    let alicante = store.load(&updated[0]).unwrap();
    assert_eq!(alicante.values(), &[1.529, 1.531]);
    assert_eq!(store.load(&updated[1]).unwrap().values(), &[1.649]);
}

#[test]
fn test_schema_error_writes_nothing() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Fecha;Provincia;Precio").unwrap();
    writeln!(file, "01/01/2024;Madrid;1,5").unwrap();
    file.flush().unwrap();

    let dir = tempdir().unwrap();
    let root = dir.path().join("segmented");
    let store = SegmentStore::new(&root);

    match store.ingest_file(file.path(), &RawPriceLoader::new()) {
        Err(ForecastError::Schema(missing)) => assert_eq!(missing, vec!["Producto".to_string()]),
        other => panic!("expected schema error, got {:?}", other),
    }
    assert!(!root.exists());
    assert!(store.segments().unwrap().is_empty());
}

#[test]
fn test_unknown_segment() {
    let dir = tempdir().unwrap();
    let store = SegmentStore::new(dir.path());
    let result = store.load(&SegmentKey::new("Madrid", "Hidrógeno"));
    assert!(matches!(result, Err(ForecastError::SegmentNotFound(_))));
}

#[test]
fn test_reserved_characters_keep_segments_apart() {
    let dir = tempdir().unwrap();
    let store = SegmentStore::new(dir.path());
    let question = SegmentKey::new("Madrid", "a?b");
    let star = SegmentKey::new("Madrid", "a*b");

    store
        .ingest(&records(&question, &[(day("2024-01-01"), 1.50)]))
        .unwrap();
    store
        .ingest(&records(&star, &[(day("2024-01-01"), 1.70)]))
        .unwrap();

    assert_ne!(store.segment_dir(&question), store.segment_dir(&star));
    assert_eq!(store.load(&question).unwrap().last_value(), Some(1.50));
    assert_eq!(store.load(&star).unwrap().last_value(), Some(1.70));
    // Directory names decode back to the original keys
    assert_eq!(store.segments().unwrap(), vec![star, question]);
}
