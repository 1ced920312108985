//! Compliance & Risk team.

use super::definition::{AgentSpec, TaskSpec, Team, TeamInputs, ToolHandle};
use super::prompts::{first_task, follow_up};

pub fn compliance_risk_team(_inputs: &TeamInputs) -> Team {
    let compliance = AgentSpec::new(
        "compliance",
        "Compliance Specialist",
        "Identify every regulation, standard and obligation that applies to the request",
        "A regulatory specialist across data protection (GDPR, DPA 2018), records \
         management and sector regulation who cites the clause, not just the act.",
    )
    .with_tools([ToolHandle::WebSearch]);

    let risk = AgentSpec::new(
        "risk",
        "Risk Analyst",
        "Build a scored risk register from the regulatory framework",
        "An enterprise risk analyst who scores likelihood and impact consistently \
         and always pairs a risk with an owner and a mitigation.",
    );

    let audit = AgentSpec::new(
        "audit",
        "Audit Specialist",
        "Plan the assurance activities that prove the controls work",
        "An internal auditor who designs testable controls and evidence requests.",
    );

    Team::new(
        "Compliance & Risk",
        vec![compliance, risk, audit],
        vec![
            TaskSpec::new(
                "regulatory_framework",
                "compliance",
                first_task(
                    "Set out the regulatory framework for the request: applicable laws, \
                     standards and internal policies, the specific obligations each one \
                     creates, and where the upstream proposals already satisfy or breach them.",
                ),
                "A regulatory framework: a table of regulation, clause, obligation and \
                 current compliance position, followed by gaps.",
            ),
            TaskSpec::new(
                "risk_register",
                "risk",
                follow_up(
                    "Build a risk register from the regulatory framework. Score each risk \
                     for likelihood and impact on a 1-5 scale, give the inherent rating, \
                     the mitigation, the owner and the residual rating.",
                ),
                "A risk register as a Markdown table (ID, risk, likelihood, impact, \
                 rating, mitigation, owner, residual) plus the top five risks explained.",
            )
            .after(&["regulatory_framework"]),
            TaskSpec::new(
                "audit_plan",
                "audit",
                follow_up(
                    "Design the audit plan: controls to test, test procedures, evidence \
                     to request, frequency and reporting line, prioritised by the risk \
                     register.",
                ),
                "An audit plan: scope, schedule, a control-test table and the \
                 reporting and escalation route.",
            )
            .after(&["regulatory_framework", "risk_register"]),
        ],
    )
}
