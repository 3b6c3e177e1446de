//! diskquery CLI Client
//!
//! Command-line interface for sending queries to a diskquery server and for
//! inspecting how the scanner tokenizes a query.

use std::io::{BufWriter, Write};
use std::net::TcpStream;
use std::process;

use clap::{Parser, Subcommand};
use diskquery::parser::{tokenize, TokenKind};
use diskquery::protocol::encode_query;

/// diskquery CLI
#[derive(Parser, Debug)]
#[command(name = "diskquery-cli")]
#[command(about = "CLI for the diskquery server")]
struct Args {
    /// Server address
    #[arg(short, long, env = "DISKQUERY_LISTEN", default_value = "127.0.0.1:3000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send one simple-query message per statement, then disconnect
    Query {
        /// Query text(s) to send
        #[arg(required = true)]
        sql: Vec<String>,
    },

    /// Tokenize a query locally and print the tokens
    Tokenize {
        /// Query text
        sql: String,
    },
}

fn main() {
    let args = Args::parse();

    let result = match args.command {
        Commands::Query { sql } => send_queries(&args.server, &sql),
        Commands::Tokenize { sql } => {
            print_tokens(&sql);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn send_queries(server: &str, queries: &[String]) -> diskquery::Result<()> {
    let stream = TcpStream::connect(server)?;
    let mut writer = BufWriter::new(stream);

    for sql in queries {
        writer.write_all(&encode_query(sql)?)?;
        println!("sent: {}", sql);
    }
    writer.flush()?;

    Ok(())
}

fn print_tokens(sql: &str) {
    for token in tokenize(sql) {
        println!("{}", token);
        if token.kind == TokenKind::Error {
            process::exit(2);
        }
    }
}
