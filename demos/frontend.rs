use esteira::{error::Diagnostics, ir::Instruction, lex::Lexer, parse, source};

fn main() {
    let stdin = std::io::stdin();
    let mut stdin = stdin.lock();

    let (start, stream) = source::consume(&mut stdin, "<stdin>");
    let lexer = Lexer::new(start.clone(), stream);

    let diagnostics = match lexer.try_exhaustive() {
        Err(errors) => Diagnostics::from(errors).kind("Lexical error"),

        Ok(tokens) => {
            print!("Tokens: {:#?}\n\n", tokens);

            match parse::parse(tokens.iter(), start) {
                Err(error) => Diagnostics::from(error).kind("Syntax error"),

                Ok(ast) => {
                    print!("Ast: {:#?}\n\n", ast);

                    let mut instructions: Vec<Instruction> = Vec::new();
                    let result = ast.lower(&mut instructions);
                    println!("Instructions: {:#?}", instructions);

                    match result {
                        Err(error) => {
                            let kind = error.as_ref().kind();
                            Diagnostics::from(error).kind(kind)
                        }

                        Ok(()) => Diagnostics::default(),
                    }
                }
            }
        }
    };

    if !diagnostics.is_empty() {
        eprint!("{}", diagnostics);
    }
}
