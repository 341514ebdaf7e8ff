use crate::ast::Block;
use crate::error::SyntaxError;
use crate::parser::Parser;

/// Pretty-print a script: parse it, then render the AST back to canonical
/// source. Two-space indentation, single spaces around operators, runs of
/// blank lines collapsed to one.
pub fn format_source(source: &str, file: &str) -> Result<String, SyntaxError> {
    let mut parser = Parser::with_file(source, file);
    let block = parser.parse()?;
    Ok(format_block(&block))
}

pub fn format_block(block: &Block) -> String {
    block.format_root()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn format(source: &str) -> String {
        format_source(source, "").expect("format failed")
    }

    #[test]
    fn normalizes_spacing_and_indentation() {
        let formatted = format("add(a,b){\nreturn a+b\n}\nx=add(1,2)\n");
        assert_eq!(
            formatted,
            indoc! {"
                add(a, b) {
                  return a + b
                }
                x = add(1, 2)
            "}
        );
    }

    #[test]
    fn collapses_blank_runs_to_one() {
        let formatted = format("a=1\n\n\n\nb=2\n");
        assert_eq!(formatted, "a = 1\n\nb = 2\n");
    }

    #[test]
    fn preserves_comments() {
        let formatted = format("// header\na = 1 // trailing\n");
        assert_eq!(formatted, "// header\na = 1\n// trailing\n");
    }

    #[test]
    fn renders_empty_bodies_on_two_lines() {
        assert_eq!(format("run(){\n\n}\n"), "run() {\n}\n");
    }

    #[test]
    fn indents_nested_blocks_per_level() {
        let formatted = format(indoc! {"
            outer() {
            if ready {
            echo(1)
            }
            }
        "});
        assert_eq!(
            formatted,
            indoc! {"
                outer() {
                  if ready {
                    echo(1)
                  }
                }
            "}
        );
    }

    #[test]
    fn formatting_is_idempotent() {
        let sources = [
            "a=1\n\n\nb=[1,2,{\nx=1\n}]\n",
            "f(n){\nif n<2{\nreturn n\n}else{\nreturn f(n-1)\n}\n}\n",
            "for i, v in rows {\necho(i,v)\n}\n",
        ];
        for source in sources {
            let once = format(source);
            let twice = format(&once);
            assert_eq!(once, twice, "not idempotent for {source:?}");
        }
    }
}
