use std::io::Write;

fn main() {
    loop {
        print!("json: ");
        std::io::stdout().flush().unwrap();
        let mut json = String::new();
        std::io::stdin().read_line(&mut json).unwrap();

        print!("expression: ");
        std::io::stdout().flush().unwrap();
        let mut expression = String::new();
        std::io::stdin().read_line(&mut expression).unwrap();

        let json: serde_json::Value = match serde_json::from_str(&json) {
            Ok(json) => json,
            Err(err) => {
                println!("{}", err);
                continue;
            }
        };
        let data = jmespath_engine::Value::from(json);
        match jmespath_engine::search(expression.trim(), &data) {
            Ok(value) => println!("{}", value),
            Err(err) => println!("{}", err),
        }
    }
}
