// Primitives for reading ranked ballots from CSV files.

use std::fs::File;

use crate::election::*;

/// A ranked ballot as read from a file, before it is submitted.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedBallot {
    pub lineno: usize,
    pub voter_id: VoterId,
    pub ranking: Vec<CandidateId>,
}

pub fn read_csv_ranking(path: String, cfs: &FileSource) -> ElectionResult<Vec<ParsedBallot>> {
    let id_idx = cfs.id_column_index()?;
    let choices_start_col = cfs.first_vote_column_index()?;

    let mut res: Vec<ParsedBallot> = Vec::new();
    let (records, row_offset) = get_records(&path, cfs)?;

    for (idx, line_r) in records.enumerate() {
        let lineno = idx + row_offset + 1;
        let line = line_r.context(CsvLineParseSnafu {})?;
        debug!("read_csv_ranking: lineno: {:?} row: {:?}", lineno, line);
        let id_cell = line.get(id_idx).context(CsvLineTooShortSnafu { lineno })?;
        let voter_id = parse_id(id_cell, lineno)?;

        let mut ranking: Vec<CandidateId> = Vec::new();
        for cell in line.iter().skip(choices_start_col) {
            // Unused ranks are left blank.
            if cell.trim().is_empty() {
                continue;
            }
            ranking.push(parse_id(cell, lineno)?);
        }

        res.push(ParsedBallot {
            lineno,
            voter_id,
            ranking,
        });
    }
    Ok(res)
}

fn parse_id(cell: &str, lineno: usize) -> ElectionResult<u32> {
    cell.trim().parse::<u32>().ok().context(CsvParseIdSnafu {
        lineno,
        value: cell.to_string(),
    })
}

fn get_records(
    path: &String,
    cfs: &FileSource,
) -> ElectionResult<(csv::StringRecordsIntoIter<File>, usize)> {
    let first_row = cfs.first_vote_row_index()?;
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path: path.clone() })?;
    let mut records = rdr.into_records();
    for _ in 0..first_row {
        _ = records.next();
    }
    Ok((records, first_row))
}
