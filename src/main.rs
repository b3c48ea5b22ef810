use std::{env, fs, path::Path};

use quill::bytecode::compile::Compiler;
use quill::bytecode::disasm::print_bc;
use quill::frontend::lexer::Lexer;
use quill::frontend::parser::Parser;
use quill::frontend::token_dumper::TokenDumper;

struct Options {
    tokens_only: bool,
    no_color: bool,
    pretty: bool,
    ast: bool,
    bytecode: bool,
    out: Option<String>,
    filename: Option<String>,
}

fn main() {
    init_logging();

    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    let options = match parse_args(&args[1..]) {
        Ok(options) => options,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            print_usage();
            std::process::exit(2);
        }
    };

    let Some(filename) = options.filename.as_deref() else {
        print_usage();
        std::process::exit(2);
    };

    ensure_extension(filename);
    let source = match fs::read_to_string(filename) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Failed to read '{}': {}", filename, e);
            std::process::exit(1);
        }
    };

    if options.tokens_only {
        dump_tokens(&source, options.no_color, options.pretty);
    } else {
        compile_file(&source, &options);
    }
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    // RUST_LOG controls the level; default to WARN if not set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut options = Options {
        tokens_only: false,
        no_color: false,
        pretty: false,
        ast: false,
        bytecode: false,
        out: None,
        filename: None,
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--tokens" => options.tokens_only = true,
            "--no-color" => options.no_color = true,
            "--pretty" => options.pretty = true,
            "--ast" => options.ast = true,
            "--bc" | "--bytecode" => options.bytecode = true,
            "--out" | "-o" => match iter.next() {
                Some(path) => options.out = Some(path.clone()),
                None => return Err("--out needs a file name".to_string()),
            },
            flag if flag.starts_with('-') => return Err(format!("unknown flag {}", flag)),
            // first non-flag argument is the filename
            file if options.filename.is_none() => options.filename = Some(file.to_string()),
            extra => return Err(format!("unexpected argument {}", extra)),
        }
    }

    Ok(options)
}

fn ensure_extension(filename: &str) {
    let path = Path::new(filename);
    if path.extension().and_then(|e| e.to_str()) != Some("ql") {
        eprintln!("Error: expected a .ql file, got {}", filename);
        std::process::exit(1);
    }
}

fn dump_tokens(source: &str, no_color: bool, pretty: bool) {
    let mut lexer = Lexer::new(source);

    match lexer.tokenize() {
        Ok(tokens) => {
            let mut dumper = TokenDumper::new();

            if no_color {
                dumper = dumper.no_color();
            }
            if pretty {
                dumper = dumper.pretty();
            }

            dumper.dump(&tokens);
        }
        Err(e) => {
            eprintln!("Lexer error: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("QUILL - bytecode compiler");
    println!();
    println!("Usage:");
    println!("  quill <file.ql>              Compile and show the disassembly");
    println!("  quill --tokens <file.ql>     Show tokens only (--no-color, --pretty)");
    println!("  quill --ast <file.ql>        Show the syntax tree");
    println!("  quill --bc <file.ql>         Show the raw bytecode program and its disassembly");
    println!("  quill <file.ql> --out <file> Also write the compiled program to <file>");
    println!("  quill --help, -h             Show this help");
    println!();
    println!("Set RUST_LOG=debug to trace compilation.");
}

fn compile_file(source: &str, options: &Options) {
    let mut lexer = Lexer::new(source);
    let tokens = match lexer.tokenize() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Lexer error: {}", e);
            std::process::exit(1);
        }
    };

    // Parse
    let mut parser = Parser::new(tokens);
    let program = match parser.parse() {
        Ok(p) => p,
        Err(errors) => {
            for e in &errors.0 {
                eprintln!("Parse error: {}", e);
            }
            std::process::exit(1);
        }
    };

    if options.ast {
        println!("{}", program);
        println!("{:#?}", program);
        return;
    }

    let program_bytecode = match Compiler::new().compile_program(&program) {
        Ok(program_bytecode) => program_bytecode,
        Err(e) => {
            eprintln!("Compile error: {}", e);
            std::process::exit(1);
        }
    };

    if options.bytecode {
        println!("{:#?}", program_bytecode);
        println!();
    }
    print_bc(&program_bytecode);

    if let Some(out) = &options.out {
        let bytes = match program_bytecode.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("Failed to encode program: {}", e);
                std::process::exit(1);
            }
        };
        if let Err(e) = fs::write(out, &bytes) {
            eprintln!("Failed to write '{}': {}", out, e);
            std::process::exit(1);
        }
        eprintln!("wrote {} bytes to {}", bytes.len(), out);
    }
}
