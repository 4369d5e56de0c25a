use esteira::{
    codegen::BANNER,
    session::{self, SessionError},
};

use std::collections::HashMap;

fn compile(text: &str) -> (Result<(), SessionError>, String) {
    let mut output = Vec::new();
    let result = session::compile(text.as_bytes(), "<test>", &mut output);

    (result, String::from_utf8(output).unwrap())
}

fn compile_ok(text: &str) -> String {
    let (result, output) = compile(text);
    if let Err(error) = result {
        panic!("{}", error);
    }

    output
}

/// Líneas entre el encabezado y el `HALT` final.
fn body(output: &str) -> Vec<&str> {
    let lines: Vec<_> = output.lines().collect();
    assert_eq!(lines.first(), Some(&BANNER));
    assert_eq!(lines.last(), Some(&"HALT"));

    lines[1..lines.len() - 1].to_vec()
}

fn rejected_as(text: &str, kind: &str) -> String {
    let (result, output) = compile(text);
    match result {
        Err(SessionError::Rejected(diagnostics)) => {
            let rendered = diagnostics.to_string();
            assert!(rendered.starts_with(kind), "{}", rendered);
        }

        other => panic!("expected {}, got {:?}", kind, other),
    }

    output
}

#[test]
fn s1_variable_round_trip() {
    let output = compile_ok("ESTEIRA p { VAR int x = 3; MOSTRAR(x); PARAR; }");
    assert_eq!(
        body(&output),
        ["PUSH 3", "STORE VAR_x", "LOAD VAR_x", "PRINT 1", "HALT"]
    );
}

#[test]
fn s2_wait_in_milliseconds() {
    let output = compile_ok("ESTEIRA p { ESPERAR(2 s); }");
    assert_eq!(body(&output), ["PUSH 2000", "SLEEP"]);
}

#[test]
fn s3_if_else() {
    let output = compile_ok("ESTEIRA p { SE (TRUE) { BIP; } SENAO { BIP; } }");
    assert_eq!(
        body(&output),
        ["PUSH 1", "JZ L0", "BEEP", "JMP L1", "L0:", "BEEP", "L1:"]
    );

    // `BEEP` no es una palabra clave de ESTEIRA
    let output = rejected_as(
        "ESTEIRA p { SE (TRUE) { BIP; } SENAO { BEEP; } }",
        "Syntax error",
    );

    assert!(output.ends_with("HALT\n"));
}

#[test]
fn s4_while_with_sensor() {
    let output = compile_ok("ESTEIRA p { ENQUANTO (SENSOR(temp) < 50) { BIP; } }");
    assert_eq!(
        body(&output),
        [
            "L0:",
            "READSENS temp",
            "PUSH 50",
            "CMPLT",
            "JZ L1",
            "BEEP",
            "JMP L0",
            "L1:"
        ]
    );
}

#[test]
fn s5_duplicate_still_halts() {
    let output = rejected_as("ESTEIRA p { VAR int x; VAR int x; }", "Duplicate symbol");
    assert_eq!(output, format!("{}\nHALT\n", BANNER));
}

#[test]
fn s6_show_many() {
    let output = compile_ok(
        r#"ESTEIRA p { VAR int x = 1; VAR float y = 2.5; MOSTRAR("v=", x, y); }"#,
    );

    assert_eq!(
        &body(&output)[4..],
        [r#"PUSHS "v=""#, "LOAD VAR_x", "LOAD VAR_y", "PRINT 3"]
    );
}

#[test]
fn partial_output_is_kept() {
    let output = rejected_as(
        "ESTEIRA p { LIGAR; BIP; ESPERAR(5 km); DESLIGAR; }",
        "Unit misuse",
    );

    assert_eq!(body(&output), ["POWERON", "BEEP"]);
}

#[test]
fn labels_are_defined_exactly_once() {
    let output = compile_ok(
        "ESTEIRA p {
            VAR int n = 0;
            VAR bool a = TRUE;
            ENQUANTO (n < 3 || a && n != 7) {
                SE (n == 1) { BIP; } SENAO { SE (a) { LIGAR; } }
                n = n + 1;
            }
            SE (a) { DESLIGAR; }
        }",
    );

    let mut defined = HashMap::new();
    for line in body(&output) {
        if let Some(label) = line.strip_suffix(':') {
            *defined.entry(label.to_owned()).or_insert(0) += 1;
        }
    }

    for line in body(&output) {
        let mut words = line.split_whitespace();
        if let (Some("JZ"), Some(target)) | (Some("JNZ"), Some(target)) | (Some("JMP"), Some(target)) =
            (words.next(), words.next())
        {
            assert_eq!(defined.get(target), Some(&1), "{}", target);
        }
    }

    assert!(defined.values().all(|&count| count == 1));
    assert!(defined.len() >= 8);
}

/// Profundidad de pila antes de cada línea, siguiendo todos los saltos.
fn simulate(lines: &[&str]) -> Vec<Option<i64>> {
    let labels: HashMap<_, _> = lines
        .iter()
        .enumerate()
        .filter_map(|(index, line)| line.strip_suffix(':').map(|label| (label, index)))
        .collect();

    let mut depths = vec![None; lines.len() + 1];
    let mut pending = vec![(0, 0)];

    while let Some((index, depth)) = pending.pop() {
        match depths[index] {
            Some(known) => {
                assert_eq!(known, depth, "inconsistent depth at line {}", index);
                continue;
            }

            None => depths[index] = Some(depth),
        }

        let line = match lines.get(index) {
            Some(line) => *line,
            None => continue,
        };

        let mut words = line.split_whitespace();
        let opcode = words.next().unwrap();
        let operand = words.next();

        let after = depth
            + match opcode {
                "PUSH" | "PUSHS" | "LOAD" | "READSENS" => 1,
                "STORE" | "SETPARAM" | "SLEEP" | "JZ" | "JNZ" => -1,
                "ADD" | "SUB" | "MUL" | "DIV" => -1,
                "CMPEQ" | "CMPNE" | "CMPLT" | "CMPGT" | "CMPLE" | "CMPGE" => -1,
                "PRINT" => -operand.unwrap().parse::<i64>().unwrap(),
                _ => 0,
            };

        assert!(after >= 0, "stack underflow at `{}`", line);

        // Las instrucciones que cierran una sentencia dejan la pila vacía
        let closes_statement = matches!(
            opcode,
            "STORE" | "SETPARAM" | "SLEEP" | "PRINT" | "BEEP" | "POWERON" | "POWEROFF" | "START"
                | "HALT"
        );

        if closes_statement {
            assert_eq!(after, 0, "`{}` leaves values on the stack", line);
        }

        match opcode {
            "JMP" => pending.push((labels[operand.unwrap()], after)),
            "JZ" | "JNZ" => {
                pending.push((labels[operand.unwrap()], after));
                pending.push((index + 1, after));
            }

            _ => pending.push((index + 1, after)),
        }
    }

    depths
}

#[test]
fn stack_is_balanced() {
    let output = compile_ok(
        r#"ESTEIRA p {
            VAR int ciclos = 0;
            VAR float alvo = 36 km/h;
            VAR bool pronto = FALSE;
            VAR string aviso = "aquecendo";
            REG R0 = velocidade;
            MEM[3] = total;

            LIGAR;
            DEFINIR potencia = 80 %;
            velocidade = alvo / 2;

            ENQUANTO (ciclos < 10 && pronto == FALSE || FALSE) {
                ciclos = ciclos + 1;
                total = total * 1.5 - -ciclos;
                SE (SENSOR(temp) >= 200 || pronto) {
                    MOSTRAR(aviso, SENSOR(temp), ciclos > 3);
                    pronto = TRUE;
                } SENAO {
                    ESPERAR((ciclos * 2) s);
                }
            }

            INICIAR;
            BIP;
            DESLIGAR;
            PARAR;
        }"#,
    );

    let lines = body(&output);
    let depths = simulate(&lines);

    assert!(depths.iter().all(Option::is_some), "unreachable code");
    assert_eq!(depths.last(), Some(&Some(0)));
}

#[test]
fn canonical_units_are_untouched() {
    let with_units = compile_ok(
        "ESTEIRA p { DEFINIR v = 3 m/s; DEFINIR d = 12.5 m; ESPERAR(40 ms); \
         DEFINIR a = 90 graus; DEFINIR f = 72 bpm; }",
    );

    let without_units = compile_ok(
        "ESTEIRA p { DEFINIR v = 3; DEFINIR d = 12.5; ESPERAR(40); \
         DEFINIR a = 90; DEFINIR f = 72; }",
    );

    assert_eq!(with_units, without_units);
    assert!(with_units.contains("PUSH 12.5\n"));
}

#[test]
fn commands_translate_one_to_one() {
    let output = compile_ok(
        "ESTEIRA p { LIGAR; BIP; INICIAR; DESLIGAR; PARAR; BIP; LIGAR; PARAR; }",
    );

    assert_eq!(
        body(&output),
        ["POWERON", "BEEP", "START", "POWEROFF", "HALT", "BEEP", "POWERON", "HALT"]
    );
}

#[test]
fn false_and_skips_right_operand() {
    let output = compile_ok(
        "ESTEIRA p {
            VAR float limite = 3;
            SE (FALSE && SENSOR(porta) > limite) { LIGAR; }
        }",
    );

    let lines = body(&output);
    assert_eq!(
        &lines[2..],
        ["PUSH 0", "JZ L0", "POWERON", "JMP L1", "L0:", "L1:"]
    );

    assert!(lines.iter().all(|line| !line.starts_with("READSENS")));
    assert_eq!(lines.iter().filter(|line| line.starts_with("LOAD")).count(), 0);
}

#[test]
fn false_chain_skips_every_operand() {
    let output = compile_ok(
        "ESTEIRA p {
            VAR bool a;
            VAR bool b;
            SE (FALSE && SENSOR(t) > 1 && SENSOR(u) > 1) { BIP; }
            SE (FALSE && a && b) { BIP; }
        }",
    );

    let lines = body(&output);
    assert!(lines.iter().all(|line| !line.starts_with("READSENS")));
    assert!(lines.iter().all(|line| !line.starts_with("LOAD")));
    assert_eq!(
        &lines[..6],
        ["PUSH 0", "JZ L0", "BEEP", "JMP L1", "L0:", "L1:"]
    );
}

#[test]
fn wait_rejects_units_inside_expressions() {
    for program in [
        "ESTEIRA p { LIGAR; ESPERAR(-2 km); }",
        "ESTEIRA p { LIGAR; ESPERAR(1 s + 50 %); }",
    ] {
        let output = rejected_as(program, "Unit misuse");
        assert_eq!(body(&output), ["POWERON"]);
    }
}

#[test]
fn float_literals_stay_finite() {
    rejected_as("ESTEIRA p { MOSTRAR(1e400); }", "Lexical error");
    rejected_as("ESTEIRA p { MOSTRAR(1e-400); }", "Lexical error");
    rejected_as("ESTEIRA p { DEFINIR v = 1e308 km; }", "Invalid literal");

    let output = compile_ok("ESTEIRA p { DEFINIR v = 1e300 m; }");
    assert!(body(&output).iter().all(|line| !line.contains("inf")));
}

#[test]
fn right_operand_is_still_checked() {
    rejected_as(
        "ESTEIRA p { SE (FALSE && desconhecido) { LIGAR; } }",
        "Undeclared symbol",
    );
}

#[test]
fn errors_are_located() {
    let (result, _) = compile("ESTEIRA p {\n  LIGAR;\n  x = 1;\n}");
    let rendered = match result {
        Err(SessionError::Rejected(diagnostics)) => diagnostics.to_string(),
        other => panic!("{:?}", other),
    };

    assert!(rendered.contains(" --> <test>:3:3"), "{}", rendered);
    assert!(rendered.contains("3 |   x = 1;"), "{}", rendered);
    assert!(rendered.ends_with("Falha na compilacao: 1 erro(s)\n"));
}
