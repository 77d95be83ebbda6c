//! Exit-code and output contracts of the three binaries.

use std::fs;
use std::process::Command;

#[test]
fn fuzzer_rejects_missing_arguments_with_exit_one() {
    let status = Command::new(env!("CARGO_BIN_EXE_kocoumat"))
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));
}

#[test]
fn fuzzer_rejects_a_missing_target_with_exit_one() {
    let dir = tempfile::tempdir().unwrap();
    let status = Command::new(env!("CARGO_BIN_EXE_kocoumat"))
        .args([
            "/nonexistent/target",
            dir.path().join("out").to_str().unwrap(),
            "0",
            "stdin",
            "10",
            "1",
        ])
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));
}

#[test]
fn fuzzer_rejects_an_incomplete_greybox_argument_group() {
    let dir = tempfile::tempdir().unwrap();
    let status = Command::new(env!("CARGO_BIN_EXE_kocoumat"))
        .args([
            "/bin/false",
            dir.path().join("out").to_str().unwrap(),
            "0",
            "stdin",
            "10",
            "1",
            "simple",
        ])
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));
}

#[test]
fn instrumenter_writes_numbered_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let main_c = dir.path().join("main.c");
    let lib_c = dir.path().join("lib.c");
    fs::write(&main_c, "int main(void) {\n    return 0;\n}\n").unwrap();
    fs::write(&lib_c, "int helper(void) {\n    return 1;\n}\n").unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_kocoumat-instrument"))
        .args([&main_c, &lib_c])
        .current_dir(dir.path())
        .status()
        .unwrap();
    assert!(status.success());

    let main_out = fs::read_to_string(dir.path().join("0_instrumented_main.c")).unwrap();
    assert!(main_out.contains("void _GenerateLcov()"));
    assert!(main_out.contains("atexit(_GenerateLcov);"));
    assert!(main_out.contains("unsigned long long _F0["));
    assert!(main_out.contains("unsigned long long _F1["));

    let lib_out = fs::read_to_string(dir.path().join("1_instrumented_main.c")).unwrap();
    assert!(lib_out.starts_with("extern unsigned long long _F1[];\n"));
    assert!(lib_out.contains("++_F1[0];return 1;"));
}

#[test]
fn seedgen_populates_the_output_directory() {
    let dir = tempfile::tempdir().unwrap();
    let src_dir = dir.path().join("src");
    let out_dir = dir.path().join("seeds");
    fs::create_dir(&src_dir).unwrap();
    fs::write(
        src_dir.join("main.c"),
        "const char *key = \"secret\";\nint limit = 4;\n",
    )
    .unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_kocoumat-seedgen"))
        .args([&src_dir, &out_dir])
        .status()
        .unwrap();
    assert!(status.success());

    let seeds: Vec<Vec<u8>> = fs::read_dir(&out_dir)
        .unwrap()
        .map(|entry| fs::read(entry.unwrap().path()).unwrap())
        .collect();

    assert!(seeds.contains(&b"secret".to_vec()));
    assert!(seeds.contains(&b"4".to_vec()));
    assert!(seeds.contains(&b"aaaa".to_vec()));
}
