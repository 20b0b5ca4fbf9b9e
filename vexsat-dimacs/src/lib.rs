//! DIMACS CNF parser and writer for the vexsat SAT solver.

use std::{borrow::Borrow, io};

use vexsat_formula::{CnfFormula, Lit, Var};

use anyhow::Error;
use thiserror::Error;

/// Possible errors while parsing a DIMACS CNF formula.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("line {line}: unexpected character in DIMACS CNF input: '{unexpected}'")]
    UnexpectedInput { line: usize, unexpected: char },
    #[error("line {line}: literal index is too large: {index}{final_digit}...")]
    LiteralTooLarge {
        line: usize,
        index: usize,
        final_digit: usize,
    },
    #[error("line {line}: invalid header syntax: {header}")]
    InvalidHeader { line: usize, header: String },
    #[error("line {line}: duplicate DIMACS CNF header")]
    DuplicateHeader { line: usize },
    #[error("line {line}: unterminated clause")]
    UnterminatedClause { line: usize },
    #[error(
        "formula has {var_count} variables while the header specifies {header_var_count} variables"
    )]
    VarCount {
        var_count: usize,
        header_var_count: usize,
    },
    #[error(
        "formula has {clause_count} clauses while the header specifies {header_clause_count} clauses"
    )]
    ClauseCount {
        clause_count: usize,
        header_clause_count: usize,
    },
}

/// Variable and clause count present in a DIMACS CNF header.
#[derive(Copy, Clone, Debug)]
pub struct DimacsHeader {
    pub var_count: usize,
    pub clause_count: usize,
}

/// Parser for DIMACS CNF files.
#[derive(Default)]
pub struct DimacsParser {
    formula: CnfFormula,
    partial_clause: Vec<Lit>,
    header: Option<DimacsHeader>,
    line_number: usize,
    clause_count: usize,
}

impl DimacsParser {
    /// Create a new DIMACS CNF parser.
    pub fn new() -> DimacsParser {
        DimacsParser {
            formula: CnfFormula::new(),
            partial_clause: vec![],
            header: None,
            line_number: 1,
            clause_count: 0,
        }
    }

    /// Parse the given input and check the header if present.
    pub fn parse(input: impl io::Read) -> Result<CnfFormula, Error> {
        let mut parser = DimacsParser::new();
        parser.parse_input(input)?;
        parser.check_header()?;
        Ok(parser.take_formula())
    }

    /// Parse the complete input, without checking the header.
    pub fn parse_input(&mut self, mut input: impl io::Read) -> Result<(), Error> {
        let mut data = vec![];
        input.read_to_end(&mut data)?;

        let mut pos = 0;

        while pos < data.len() {
            match data[pos] {
                b'\n' => {
                    self.line_number += 1;
                    pos += 1;
                }
                b' ' | b'\t' | b'\r' => pos += 1,
                b'c' => {
                    while pos < data.len() && data[pos] != b'\n' {
                        pos += 1;
                    }
                }
                b'p' => {
                    let line_end = data[pos..]
                        .iter()
                        .position(|&byte| byte == b'\n')
                        .map(|offset| pos + offset)
                        .unwrap_or_else(|| data.len());
                    self.parse_header_line(&data[pos..line_end])?;
                    pos = line_end;
                }
                b'-' | b'0'..=b'9' => {
                    pos = self.parse_lit(&data, pos)?;
                }
                unexpected => {
                    return Err(ParserError::UnexpectedInput {
                        line: self.line_number,
                        unexpected: unexpected as char,
                    }
                    .into());
                }
            }
        }

        if !self.partial_clause.is_empty() {
            return Err(ParserError::UnterminatedClause {
                line: self.line_number,
            }
            .into());
        }

        Ok(())
    }

    /// Verify the formula against the header if one was present.
    pub fn check_header(&self) -> Result<(), ParserError> {
        if let Some(header) = self.header {
            if self.formula.var_count() > header.var_count {
                return Err(ParserError::VarCount {
                    var_count: self.formula.var_count(),
                    header_var_count: header.var_count,
                });
            }
            if self.clause_count != header.clause_count {
                return Err(ParserError::ClauseCount {
                    clause_count: self.clause_count,
                    header_clause_count: header.clause_count,
                });
            }
        }
        Ok(())
    }

    /// Return the parsed formula, consuming the parser's buffer.
    ///
    /// If a header was present, the formula's variable count is extended to the header's count.
    pub fn take_formula(&mut self) -> CnfFormula {
        let mut formula = std::mem::replace(&mut self.formula, CnfFormula::new());
        if let Some(header) = self.header {
            formula.set_var_count(header.var_count);
        }
        formula
    }

    /// The header of the parsed input, if present.
    pub fn header(&self) -> Option<DimacsHeader> {
        self.header
    }

    /// Number of clauses parsed so far.
    pub fn clause_count(&self) -> usize {
        self.clause_count
    }

    /// Number of variables in the parsed formula or the header, whichever is larger.
    pub fn var_count(&self) -> usize {
        self.formula.var_count()
    }

    fn parse_header_line(&mut self, line: &[u8]) -> Result<(), ParserError> {
        let invalid_header = || ParserError::InvalidHeader {
            line: self.line_number,
            header: String::from_utf8_lossy(line).into_owned(),
        };

        if self.header.is_some() {
            return Err(ParserError::DuplicateHeader {
                line: self.line_number,
            });
        }

        let line_str = std::str::from_utf8(line).map_err(|_| invalid_header())?;
        let mut fields = line_str.split_whitespace();

        if fields.next() != Some("p") || fields.next() != Some("cnf") {
            return Err(invalid_header());
        }

        let var_count: usize = fields
            .next()
            .and_then(|field| field.parse().ok())
            .filter(|&count| count <= Var::MAX_COUNT)
            .ok_or_else(invalid_header)?;
        let clause_count: usize = fields
            .next()
            .and_then(|field| field.parse().ok())
            .ok_or_else(invalid_header)?;

        if fields.next().is_some() {
            return Err(invalid_header());
        }

        self.header = Some(DimacsHeader {
            var_count,
            clause_count,
        });
        Ok(())
    }

    fn parse_lit(&mut self, data: &[u8], mut pos: usize) -> Result<usize, ParserError> {
        let negative = data[pos] == b'-';
        if negative {
            pos += 1;
        }

        let mut index = 0usize;
        let mut digits = 0;

        while let Some(&(byte @ b'0'..=b'9')) = data.get(pos) {
            let digit = (byte - b'0') as usize;
            if index > Var::MAX_COUNT / 10 || index * 10 + digit > Var::MAX_COUNT {
                return Err(ParserError::LiteralTooLarge {
                    line: self.line_number,
                    index,
                    final_digit: digit,
                });
            }
            index = index * 10 + digit;
            digits += 1;
            pos += 1;
        }

        let followed_by_ws = match data.get(pos) {
            None => true,
            Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => true,
            _ => false,
        };

        if digits == 0 || !followed_by_ws {
            return Err(ParserError::UnexpectedInput {
                line: self.line_number,
                unexpected: data.get(pos).map(|&byte| byte as char).unwrap_or(' '),
            });
        }

        if index == 0 {
            self.formula.add_clause(self.partial_clause.iter().cloned());
            self.partial_clause.clear();
            self.clause_count += 1;
        } else {
            let number = index as isize;
            self.partial_clause
                .push(Lit::from_dimacs(if negative { -number } else { number }));
        }

        Ok(pos)
    }
}

/// Write a formula header in DIMACS CNF format.
///
/// Can be used with [`write_dimacs_clauses`] to implement incremental writing.
pub fn write_dimacs_header(target: &mut impl io::Write, header: DimacsHeader) -> io::Result<()> {
    writeln!(
        target,
        "p cnf {var_count} {clause_count}",
        var_count = header.var_count,
        clause_count = header.clause_count
    )
}

/// Write the clauses of a formula in DIMACS CNF format.
///
/// Can be used with [`write_dimacs_header`] to implement incremental writing.
pub fn write_dimacs_clauses(
    target: &mut impl io::Write,
    clauses: impl IntoIterator<Item = impl IntoIterator<Item = impl Borrow<Lit>>>,
) -> io::Result<()> {
    for clause in clauses.into_iter() {
        for lit in clause.into_iter() {
            itoa::write(&mut *target, lit.borrow().to_dimacs())?;
            target.write_all(b" ")?;
        }
        target.write_all(b"0\n")?;
    }
    Ok(())
}

/// Write a formula in DIMACS CNF format.
pub fn write_dimacs(target: &mut impl io::Write, formula: &CnfFormula) -> io::Result<()> {
    write_dimacs_header(
        &mut *target,
        DimacsHeader {
            var_count: formula.var_count(),
            clause_count: formula.len(),
        },
    )?;
    write_dimacs_clauses(&mut *target, formula.iter())
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use vexsat_formula::{cnf_formula, lit::strategy::lit};

    #[test]
    fn parse_simple_formula() {
        let input = b"c example\np cnf 4 3\n1 2 0\n-2 3 -4 0\n4 0\n";

        let formula = DimacsParser::parse(&input[..]).expect("parse failed");

        assert_eq!(
            formula,
            cnf_formula![
                1, 2;
                -2, 3, -4;
                4;
            ]
        );
    }

    #[test]
    fn parse_without_header() {
        let input = b"1 -2 0 2 0";

        let formula = DimacsParser::parse(&input[..]).expect("parse failed");

        assert_eq!(
            formula,
            cnf_formula![
                1, -2;
                2;
            ]
        );
    }

    #[test]
    fn header_extends_var_count() {
        let input = b"p cnf 9 1\n1 2 0\n";

        let formula = DimacsParser::parse(&input[..]).expect("parse failed");

        assert_eq!(formula.var_count(), 9);
    }

    #[test]
    fn rejects_unexpected_characters() {
        let input = b"p cnf 2 1\n1 x 0\n";

        let err = DimacsParser::parse(&input[..]).unwrap_err();
        let err = err.downcast::<ParserError>().expect("unexpected error type");

        match err {
            ParserError::UnexpectedInput { line: 2, .. } => (),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn rejects_unterminated_clause() {
        let input = b"1 2\n";

        let err = DimacsParser::parse(&input[..]).unwrap_err();
        let err = err.downcast::<ParserError>().expect("unexpected error type");

        match err {
            ParserError::UnterminatedClause { .. } => (),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn rejects_clause_count_mismatch() {
        let input = b"p cnf 3 2\n1 2 3 0\n";

        let err = DimacsParser::parse(&input[..]).unwrap_err();
        let err = err.downcast::<ParserError>().expect("unexpected error type");

        match err {
            ParserError::ClauseCount {
                clause_count: 1,
                header_clause_count: 2,
            } => (),
            other => panic!("unexpected error {:?}", other),
        }
    }

    proptest! {
        #[test]
        fn write_parse_roundtrip(input in proptest::collection::vec(
            proptest::collection::vec(lit(0..100usize), 1..8),
            0..50,
        )) {
            let formula = CnfFormula::from(input.iter().map(|clause| clause.iter().cloned()));

            let mut buf = vec![];
            write_dimacs(&mut buf, &formula).unwrap();

            let parsed = DimacsParser::parse(&buf[..]).expect("parse failed");

            prop_assert_eq!(parsed, formula);
        }
    }
}
