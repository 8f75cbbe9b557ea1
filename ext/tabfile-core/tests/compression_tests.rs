use rstest::rstest;
use std::io::Cursor;
use tabfile_core::*;

use test_helpers::*;

#[rstest]
#[case::none(Compression::None)]
#[case::snappy(Compression::Snappy)]
#[case::gzip(Compression::Gzip)]
#[case::lz4(Compression::Lz4)]
#[case::zstd(Compression::Zstd)]
fn test_compression_transparency(#[case] compression: Compression) {
    init_logging();
    let options = WriteOptions::with_compression(compression);
    assert_roundtrip(&basic_types_table(), &options);
    assert_roundtrip(&generate_nullable_table(1000), &options);
}

#[rstest]
#[case::snappy(Compression::Snappy)]
#[case::gzip(Compression::Gzip)]
#[case::lz4(Compression::Lz4)]
#[case::zstd(Compression::Zstd)]
fn test_compressible_blocks_are_tagged(#[case] compression: Compression) {
    // a long repeating sequence compresses under every codec
    let table = Table::try_new(vec![Column::from_values(
        "n",
        ColumnType::Int64,
        (0..4096i64).map(|i| i % 4),
    )])
    .unwrap();
    let options = WriteOptions::with_compression(compression);
    let bytes = write_table_to_vec(&table, &options).unwrap();
    let plain = write_table_to_vec(&table, &WriteOptions::default()).unwrap();
    assert!(bytes.len() < plain.len());

    let reader = Reader::new(Cursor::new(bytes)).unwrap();
    assert_eq!(reader.footer().blocks[0].compression, compression);
}

#[rstest]
#[case::gzip(Compression::Gzip)]
#[case::zstd(Compression::Zstd)]
fn test_tiny_blocks_stored_uncompressed(#[case] compression: Compression) {
    let table = basic_types_table();
    let bytes = write_table_to_vec(&table, &WriteOptions::with_compression(compression)).unwrap();

    let mut reader = Reader::new(Cursor::new(bytes)).unwrap();
    // three booleans bit-pack into a single byte
    let bool_block = reader.footer().blocks[3];
    assert_eq!(bool_block.length, 1);
    assert_eq!(bool_block.compression, Compression::None);
    assert_eq!(reader.read_table().unwrap(), table);
}

#[rstest]
#[case::fastest(1)]
#[case::default(3)]
#[case::strong(19)]
fn test_zstd_levels(#[case] level: i32) {
    let mut writer = WriterBuilder::new()
        .with_compression(Compression::Zstd)
        .with_compression_level(level)
        .build(Vec::new());
    let table = generate_nullable_table(2000);
    writer.write_table(&table).unwrap();
    let bytes = writer.close().unwrap();

    let read = Reader::new(Cursor::new(bytes)).unwrap().read_table().unwrap();
    assert_eq!(read, table);
}

#[test]
fn test_compression_from_str() {
    for (name, expected) in [
        ("none", Compression::None),
        ("Snappy", Compression::Snappy),
        ("GZIP", Compression::Gzip),
        ("lz4", Compression::Lz4),
        ("zstd", Compression::Zstd),
    ] {
        assert_eq!(name.parse::<Compression>().unwrap(), expected);
    }
    let err = "lzo".parse::<Compression>().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}
