use std::{
    env, fs,
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
};

fn scratch_dir(name: &str) -> PathBuf {
    let directory = env::temp_dir()
        .join(format!("esteirac-{}", std::process::id()))
        .join(name);

    fs::create_dir_all(&directory).unwrap();
    directory
}

fn scratch(name: &str) -> PathBuf {
    scratch_dir("files").join(name)
}

/// Ejecuta `esteirac` con el programa en la entrada estándar.
fn esteirac_stdin(directory: &Path, args: &[&str], program: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_esteirac"))
        .args(args)
        .current_dir(directory)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    child
        .stdin
        .take()
        .unwrap()
        .write_all(program.as_bytes())
        .unwrap();

    child.wait_with_output().unwrap()
}

fn esteirac(args: &[&PathBuf]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_esteirac"))
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn writes_output_file() {
    let (input, output) = (scratch("ok.esteira"), scratch("ok.mwasm"));
    fs::write(&input, "ESTEIRA p { BIP; }\n").unwrap();

    let run = esteirac(&[&input, &output]);
    assert!(run.status.success());
    assert!(run.stderr.is_empty());

    let text = fs::read_to_string(&output).unwrap();
    assert!(text.ends_with("BEEP\nHALT\n"), "{}", text);
}

#[test]
fn failures_exit_with_diagnostics() {
    let (input, output) = (scratch("dup.esteira"), scratch("dup.mwasm"));
    fs::write(&input, "ESTEIRA p { VAR int x; VAR int x; }\n").unwrap();

    let run = esteirac(&[&input, &output]);
    assert_eq!(run.status.code(), Some(1));

    let stderr = String::from_utf8(run.stderr).unwrap();
    assert!(stderr.starts_with("Duplicate symbol"), "{}", stderr);
    assert!(stderr.contains("Falha na compilacao"));

    let text = fs::read_to_string(&output).unwrap();
    assert!(text.ends_with("HALT\n"));
}

#[test]
fn missing_input_is_reported() {
    let (input, output) = (scratch("nowhere.esteira"), scratch("nowhere.mwasm"));

    let run = esteirac(&[&input, &output]);
    assert_eq!(run.status.code(), Some(1));

    let stderr = String::from_utf8(run.stderr).unwrap();
    assert!(stderr.starts_with("Falha na compilacao: Failed to open for reading"), "{}", stderr);
}

#[test]
fn stdin_to_default_output() {
    let directory = scratch_dir("default");
    let run = esteirac_stdin(&directory, &[], "ESTEIRA p { LIGAR; }\n");

    assert!(run.status.success(), "{}", String::from_utf8_lossy(&run.stderr));
    assert!(run.stdout.is_empty());

    let text = fs::read_to_string(directory.join("programa.mwasm")).unwrap();
    assert!(text.starts_with("; Codigo gerado"), "{}", text);
    assert!(text.ends_with("POWERON\nHALT\n"), "{}", text);
}

#[test]
fn dash_writes_to_stdout() {
    let directory = scratch_dir("dash");
    let input = directory.join("bip.esteira");
    fs::write(&input, "ESTEIRA p { BIP; }\n").unwrap();

    let input = input.to_str().unwrap();
    let run = esteirac_stdin(&directory, &[input, "-"], "");
    assert!(run.status.success());

    let stdout = String::from_utf8(run.stdout).unwrap();
    assert!(stdout.ends_with("BEEP\nHALT\n"), "{}", stdout);
    assert!(!directory.join("programa.mwasm").exists());
}

#[test]
fn stdin_rejection_is_reported() {
    let directory = scratch_dir("rejected");
    let run = esteirac_stdin(&directory, &[], "ESTEIRA p { x = 1; }\n");

    assert_eq!(run.status.code(), Some(1));

    let stderr = String::from_utf8(run.stderr).unwrap();
    assert!(stderr.starts_with("Undeclared symbol"), "{}", stderr);
    assert!(stderr.contains(" --> <stdin>:1:13"), "{}", stderr);

    let text = fs::read_to_string(directory.join("programa.mwasm")).unwrap();
    assert!(text.ends_with("HALT\n"));
}
