//! Tender Response team. Works best with the tender pack supplied as the
//! reference document.

use super::definition::{AgentSpec, TaskSpec, Team, TeamInputs};
use super::prompts::{first_task, follow_up};

pub fn tender_response_team(inputs: &TeamInputs) -> Team {
    let source_note = if inputs.has_document() {
        "Work from the tender document in the reference section; quote requirement \
         identifiers exactly."
    } else {
        "No tender document was supplied: infer the likely requirements from the \
         request and upstream outputs, and label every inferred requirement as such."
    };

    let analyst = AgentSpec::new(
        "tender_analyst",
        "Tender Analyst",
        "Break the tender into requirements, evaluation criteria and risks",
        "A bid manager who has qualified hundreds of public-sector tenders and \
         never misses a mandatory requirement.",
    );

    let writer = AgentSpec::new(
        "proposal_writer",
        "Proposal Writer",
        "Write a persuasive, compliant proposal that scores highly on each criterion",
        "A bid writer who answers the question asked, evidences every claim and \
         writes to the evaluator's scoring guide.",
    );

    let checker = AgentSpec::new(
        "compliance_checker",
        "Compliance Checker",
        "Verify the proposal against every requirement before submission",
        "A meticulous bid assurance reviewer who treats any unanswered mandatory \
         requirement as a fail.",
    );

    Team::new(
        "Tender Response",
        vec![analyst, writer, checker],
        vec![
            TaskSpec::new(
                "tender_analysis",
                "tender_analyst",
                first_task(&format!(
                    "Analyse the tender. List every mandatory and desirable requirement, \
                     the evaluation criteria and weightings, key dates, and bid/no-bid \
                     risks. {}",
                    source_note
                )),
                "A tender analysis: requirements matrix (ID, requirement, type, \
                 weighting), key dates, win themes and risks.",
            ),
            TaskSpec::new(
                "proposal",
                "proposal_writer",
                follow_up(
                    "Write the proposal response. Address each requirement from the \
                     analysis in order, using the work of the previous teams as \
                     evidence, and close with pricing assumptions and delivery approach.",
                ),
                "A full proposal in Markdown with one section per requirement group, \
                 an executive summary and a delivery approach.",
            )
            .after(&["tender_analysis"])
            .with_timeout(240),
            TaskSpec::new(
                "compliance_verdict",
                "compliance_checker",
                follow_up(
                    "Check the proposal against the requirements matrix. Mark each \
                     requirement Compliant, Partially Compliant or Non-Compliant with a \
                     reason, then give an overall verdict and the fixes required.",
                ),
                "A compliance verdict: requirement-by-requirement table, overall \
                 verdict (PASS or FAIL) and a prioritised list of fixes.",
            )
            .after(&["tender_analysis", "proposal"]),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_sequence() {
        let team = tender_response_team(&TeamInputs::new("q"));
        team.validate().unwrap();
        assert_eq!(
            team.roles(),
            vec!["Tender Analyst", "Proposal Writer", "Compliance Checker"]
        );
    }

    #[test]
    fn test_document_changes_instructions() {
        let without = tender_response_team(&TeamInputs::new("q"));
        let with = tender_response_team(&TeamInputs {
            document_context: "ITT ref 42".to_string(),
            ..TeamInputs::new("q")
        });
        assert!(without.tasks[0].description_template.contains("No tender document"));
        assert!(with.tasks[0].description_template.contains("quote requirement identifiers"));
    }
}
