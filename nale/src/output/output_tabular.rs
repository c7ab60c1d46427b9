//! Tab-separated results output, one line per [`Alignment`].

use std::io::{self, Write};

use crate::structs::alignment::Alignment;

/// Write one tab-separated record per alignment via
/// [`Alignment::tab_string`], in the order given.
pub fn write_tabular_output<W: Write>(alignments: &[Alignment], writer: &mut W) -> io::Result<()> {
    for alignment in alignments {
        writeln!(writer, "{}", alignment.tab_string())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::alignment::ScoreParams;
    use crate::structs::hmm::{Hmm, Profile, NUM_CORE_TRANS};
    use crate::structs::sequence::{Sequence, NUM_AMINO};
    use crate::structs::trace::{Trace, TraceStep};

    fn toy_profile() -> Profile {
        let leng = 2;
        let match_emissions = vec![[0.0f32; NUM_AMINO]; leng + 1];
        let insert_emissions = vec![[0.0f32; NUM_AMINO]; leng + 1];
        let transitions = vec![[f32::NEG_INFINITY; NUM_CORE_TRANS]; leng + 1];
        let hmm = Hmm {
            name: "toy".to_string(),
            accession: "TOY".to_string(),
            leng,
            match_emissions,
            insert_emissions,
            transitions,
            viterbi_mu: 0.0,
            viterbi_lambda: 1.0,
            forward_tau: 0.0,
            forward_lambda: 1.0,
        };
        Profile::new(&hmm)
    }

    #[test]
    fn writes_one_line_per_alignment() {
        let profile = toy_profile();
        let target = Sequence::from_utf8_named("t1".to_string(), b"AC").unwrap();
        let mut trace = Trace::new(target.length, profile.length);
        trace.push(TraceStep::Begin, 1, 1);
        trace.push(TraceStep::Match, 1, 1);
        trace.push(TraceStep::End, 1, 1);

        let alignment = Alignment::new(&trace, &profile, &target, 1);
        let mut buf = Vec::new();
        write_tabular_output(&[alignment], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("toy\tt1\t"));
    }

    #[test]
    fn empty_slice_writes_nothing() {
        let mut buf = Vec::new();
        write_tabular_output(&[], &mut buf).unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn score_params_variant_uses_caller_supplied_scores() {
        let profile = toy_profile();
        let target = Sequence::from_utf8_named("t2".to_string(), b"AC").unwrap();
        let mut trace = Trace::new(target.length, profile.length);
        trace.push(TraceStep::Match, 1, 1);

        let mut params = ScoreParams::new(10);
        params.forward_score_nats = 5.0;
        params.null_score_nats = 1.0;
        let alignment = Alignment::from_trace(&trace, &profile, &target, &params);

        let mut buf = Vec::new();
        write_tabular_output(&[alignment], &mut buf).unwrap();
        assert!(!buf.is_empty());
    }
}
