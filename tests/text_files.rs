use basic_fileio::{FileHandleFactory, FileIoError, OpenMode, Value};
use chrono::NaiveDate;
use tempfile::TempDir;

fn factory() -> FileHandleFactory {
    FileHandleFactory::new()
}

#[test]
fn write_then_input_round_trips_fields() {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("people.txt");
    let birthday = NaiveDate::from_ymd_opt(1984, 6, 1)
        .expect("valid date")
        .and_hms_opt(0, 0, 0)
        .expect("valid time");

    let mut out = factory()
        .open(&path, OpenMode::Output, None, -1)
        .expect("open for output");
    out.write_line(&[
        Value::from("Doe, Jane"),
        Value::Integer(42),
        Value::Bool(true),
        Value::Date(birthday),
    ])
    .expect("write first line");
    out.write_line(&[Value::from("Roe"), Value::Double(-1.5), Value::Null])
        .expect("write second line");
    out.close().expect("close output");

    assert_eq!(
        std::fs::read_to_string(&path).expect("read back"),
        "\"Doe, Jane\",42,#True#,#1984-06-01#\r\n\"Roe\",-1.5,#NULL#\r\n"
    );

    let mut input = factory()
        .open(&path, OpenMode::Input, None, -1)
        .expect("open for input");
    assert_eq!(input.input_as::<String>().expect("name"), "Doe, Jane");
    assert_eq!(input.input_as::<i32>().expect("age"), 42);
    assert!(input.input_as::<bool>().expect("flag"));
    assert_eq!(
        input.input_as::<chrono::NaiveDateTime>().expect("date"),
        birthday
    );

    let mut untyped = vec![Value::Empty; 3];
    for value in untyped.iter_mut() {
        input.input(value).expect("untyped field");
    }
    assert_eq!(
        untyped,
        vec![Value::from("Roe"), Value::Double(-1.5), Value::Null]
    );
    assert!(input.is_end_of_file().expect("eof"));
}

#[test]
fn print_output_reads_back_as_lines() {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("report.txt");

    let mut out = factory()
        .open(&path, OpenMode::Output, None, -1)
        .expect("open for output");
    out.print_line(&[Value::from("Total"), Value::Integer(12)])
        .expect("print total");
    out.print_line(&[]).expect("blank line");
    out.print(&[Value::from("no newline")]).expect("print tail");
    out.close().expect("close output");

    let mut input = factory()
        .open(&path, OpenMode::Input, None, -1)
        .expect("open for input");
    assert_eq!(
        input.line_input().expect("first line"),
        format!("Total{} 12 ", " ".repeat(9))
    );
    assert_eq!(input.line_input().expect("blank line"), "");
    assert_eq!(input.line_input().expect("tail"), "no newline");
    assert!(matches!(input.line_input(), Err(FileIoError::EndOfFile)));
}

#[test]
fn append_continues_existing_file() {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("log.txt");

    for entry in ["one", "two"] {
        let mut out = factory()
            .open(&path, OpenMode::Append, None, -1)
            .expect("open for append");
        out.write_line(&[Value::from(entry)]).expect("append entry");
        out.close().expect("close append");
    }

    let mut input = factory()
        .open(&path, OpenMode::Input, None, -1)
        .expect("open for input");
    assert_eq!(input.input_as::<String>().expect("first"), "one");
    assert_eq!(input.input_as::<String>().expect("second"), "two");
    assert!(input.is_end_of_file().expect("eof"));
}

#[test]
fn binary_mode_reads_text_with_legacy_rules() {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("mixed.bin");
    std::fs::write(&path, "&H20 2.5,\"quoted, text\"\r\n").expect("seed file");

    let mut file = factory()
        .open(&path, OpenMode::Binary, None, -1)
        .expect("open binary");
    assert_eq!(file.input_as::<i16>().expect("hex"), 32);
    assert_eq!(file.input_as::<i32>().expect("rounded"), 2);
    assert_eq!(file.input_as::<String>().expect("text"), "quoted, text");
    assert!(file.is_end_of_file().expect("eof"));

    // the same bytes through Input mode are strict
    let mut strict = factory()
        .open(&path, OpenMode::Input, None, -1)
        .expect("open input");
    assert!(matches!(
        strict.input_as::<i16>(),
        Err(FileIoError::TypeMismatch { .. })
    ));
}
