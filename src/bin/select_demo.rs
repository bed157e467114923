use pest::Parser;
use rorql::compiler::pest_parser::{build_query, Rule, SelectParser};
use rorql::compiler::describe;

fn main() {
    let queries = vec![
        r#"select series from study where series has modality == "MR""#,
        r#"select study from study where series has modality == "MR" also where series has modality == "CT""#,
        r#"select patient where series named "t1" has classifyTypes containing "T1" and imageCount > 100"#,
        r#"SELECT project FROM study WHERE SERIES NAMED "dwi" HAS seriesDescription regexp "(?i)diff""#,
        r#"select series where ("0x0008","0x103e") contains "mprage" /* raw tag */"#,
        r#"select series where numImages >= 10 and numImages <= 200"#,
        r#"select series where (modality == MR or modality == CT) and not seriesDescription contains "scout""#,
        r#"select study where series named "t1" has modality == MR also where series named "ct" has modality == CT check "t1"@(0020,0052) == "ct"@(0020,0052)"#,
        r#"select series where seriesDescription == "it's \"axial\"""#,
        // not statements
        r#"select everything"#,
        r#"Modality: MR"#,
    ];
    for query in queries {
        match SelectParser::parse(Rule::query, query) {
            Ok(mut pairs) => match pairs.next().map(build_query) {
                Some(Ok(ast)) => {
                    println!("Valid! {}", describe(&ast));
                    println!("AST: {:#?}", ast);
                }
                Some(Err(e)) => println!("Invalid! Error: {}", e),
                None => println!("Invalid! Empty parse"),
            },
            Err(e) => {
                println!("Invalid! Error: {}", e);
            }
        }
    }
}
