//! Built-in node definitions for the CRM automation designer.

use crate::catalog::{ConfigFieldDefinition as Field, NodeDefinition};
use crate::node::{NodeCategory, NodeType};
use crate::port::Ports;
use serde_json::json;

const LEAD_SOURCES: &[(&str, &str)] = &[
    ("any", "Any source"),
    ("website", "Website"),
    ("referral", "Referral"),
    ("paid_ads", "Paid ads"),
    ("event", "Event"),
];

const PRIORITIES: &[(&str, &str)] = &[
    ("low", "Low"),
    ("medium", "Medium"),
    ("high", "High"),
    ("urgent", "Urgent"),
];

const OPERATORS: &[(&str, &str)] = &[
    ("equals", "Equals"),
    ("not_equals", "Does not equal"),
    ("contains", "Contains"),
    ("greater_than", "Greater than"),
    ("less_than", "Less than"),
    ("is_empty", "Is empty"),
];

const MODELS: &[(&str, &str)] = &[
    ("gpt-4o", "GPT-4o"),
    ("gpt-4o-mini", "GPT-4o mini"),
];

fn node(category: NodeCategory, kind: &str, label: &str, description: &str) -> NodeDefinition {
    NodeDefinition::new(NodeType::new(category, kind), label, description)
}

/// Returns the built-in definitions in palette order.
pub(crate) fn definitions() -> Vec<NodeDefinition> {
    let mut all = triggers();
    all.extend(actions());
    all.extend(logic());
    all.extend(ai());
    all.extend(integrations());
    all
}

fn triggers() -> Vec<NodeDefinition> {
    use NodeCategory::Trigger;
    vec![
        node(Trigger, "lead_created", "Lead Created", "Runs when a new lead is added")
            .icon("user-plus")
            .field(
                Field::select("source", "Lead source", LEAD_SOURCES)
                    .default_value("any")
                    .help("Only run for leads from this source"),
            ),
        node(Trigger, "form_submitted", "Form Submitted", "Runs when an intake form is submitted")
            .icon("clipboard")
            .field(
                Field::text("form_id", "Form")
                    .required()
                    .placeholder("service-intake"),
            ),
        node(Trigger, "proposal_accepted", "Proposal Accepted", "Runs when a client accepts a proposal")
            .icon("file-check")
            .field(Field::number("min_value", "Minimum value").help("Ignore proposals below this amount")),
        node(Trigger, "schedule", "Schedule", "Runs on a recurring schedule")
            .icon("clock")
            .field(
                Field::text("cron", "Schedule (cron)")
                    .required()
                    .default_value("0 9 * * 1")
                    .placeholder("0 9 * * *"),
            )
            .field(Field::text("timezone", "Timezone").default_value("UTC")),
        node(Trigger, "webhook_received", "Webhook Received", "Runs when an external system calls in")
            .icon("webhook")
            .field(
                Field::text("path", "Path")
                    .required()
                    .placeholder("/hooks/new-lead"),
            )
            .field(Field::text("secret", "Shared secret")),
    ]
}

fn actions() -> Vec<NodeDefinition> {
    use NodeCategory::Action;
    vec![
        node(Action, "send_email", "Send Email", "Sends an email to a lead or client")
            .icon("mail")
            .field(
                Field::variable("to", "To")
                    .required()
                    .placeholder("{{lead.email}}")
                    .help("Recipient address or variable"),
            )
            .field(
                Field::text("subject", "Subject")
                    .required()
                    .default_value("Thanks for reaching out"),
            )
            .field(
                Field::textarea("body", "Body")
                    .required()
                    .default_value("Hi {{lead.first_name}},\n\nThanks for getting in touch."),
            )
            .field(Field::boolean("cc_owner", "CC lead owner")),
        node(Action, "create_task", "Create Task", "Creates a follow-up task")
            .icon("check-square")
            .field(Field::text("title", "Title").required().placeholder("Call {{lead.name}}"))
            .field(Field::variable("assignee", "Assignee").default_value("{{lead.owner}}"))
            .field(Field::number("due_in_days", "Due in (days)").default_value(2))
            .field(Field::select("priority", "Priority", PRIORITIES).default_value("medium")),
        node(Action, "update_lead", "Update Lead", "Updates fields on the lead record")
            .icon("edit")
            .field(
                Field::select(
                    "status",
                    "Status",
                    &[
                        ("new", "New"),
                        ("contacted", "Contacted"),
                        ("qualified", "Qualified"),
                        ("proposal", "Proposal sent"),
                        ("won", "Won"),
                        ("lost", "Lost"),
                    ],
                )
                .required(),
            )
            .field(Field::json("fields", "Other fields").help("Extra fields to set, as JSON")),
        node(Action, "send_slack_message", "Send Slack Message", "Posts a message to a Slack channel")
            .icon("message-square")
            .field(Field::text("channel", "Channel").required().placeholder("#sales"))
            .field(
                Field::textarea("message", "Message")
                    .required()
                    .default_value("New lead: {{lead.name}}"),
            ),
        node(Action, "create_project", "Create Project", "Opens a delivery project for a won deal")
            .icon("folder-plus")
            .field(Field::text("name", "Project name").required().default_value("{{company.name}} onboarding"))
            .field(Field::text("template", "Template")),
    ]
}

fn logic() -> Vec<NodeDefinition> {
    use NodeCategory::Logic;
    vec![
        node(Logic, "condition", "Condition", "Routes the run down the true or false branch")
            .icon("git-branch")
            .ports(Ports::branching(&[("true", "True"), ("false", "False")]))
            .field(Field::variable("field", "Field").required().placeholder("{{lead.score}}"))
            .field(Field::select("operator", "Operator", OPERATORS).required().default_value("equals"))
            .field(Field::text("value", "Value")),
        node(Logic, "delay", "Delay", "Waits before continuing")
            .icon("hourglass")
            .field(Field::number("amount", "Amount").required().default_value(1))
            .field(
                Field::select(
                    "unit",
                    "Unit",
                    &[("minutes", "Minutes"), ("hours", "Hours"), ("days", "Days")],
                )
                .required()
                .default_value("days"),
            ),
        node(Logic, "split", "A/B Split", "Sends runs down one of two paths")
            .icon("split")
            .ports(Ports::branching(&[("a", "Path A"), ("b", "Path B")]))
            .field(
                Field::number("percentage_a", "Path A share (%)")
                    .required()
                    .default_value(50),
            ),
        node(Logic, "loop", "Loop", "Repeats the downstream steps for each item")
            .icon("repeat")
            .allow_cycles()
            .field(Field::variable("items", "Items").required().placeholder("{{lead.contacts}}"))
            .field(Field::number("max_iterations", "Max iterations").default_value(10)),
    ]
}

fn ai() -> Vec<NodeDefinition> {
    use NodeCategory::Ai;
    vec![
        node(Ai, "gpt_processing", "GPT Processing", "Runs a prompt over the run's data")
            .icon("cpu")
            .field(Field::textarea("prompt", "Prompt").required().placeholder("Summarise {{lead.notes}}"))
            .field(Field::select("model", "Model", MODELS).default_value("gpt-4o-mini"))
            .field(Field::number("temperature", "Temperature").default_value(0.7))
            .field(Field::text("output_variable", "Save result as").default_value("ai_result")),
        node(Ai, "lead_scoring", "Lead Scoring", "Scores a lead from 0 to 100")
            .icon("gauge")
            .field(Field::textarea("criteria", "Scoring criteria").required())
            .field(Field::text("output_variable", "Save score as").default_value("lead_score")),
        node(Ai, "sentiment_analysis", "Sentiment Analysis", "Classifies the tone of a message")
            .icon("smile")
            .field(Field::variable("text", "Text").required().default_value("{{message.body}}")),
        node(Ai, "content_generation", "Content Generation", "Drafts copy for emails or proposals")
            .icon("pen-tool")
            .field(Field::textarea("instructions", "Instructions").required())
            .field(
                Field::select(
                    "tone",
                    "Tone",
                    &[("friendly", "Friendly"), ("formal", "Formal"), ("concise", "Concise")],
                )
                .default_value("friendly"),
            ),
    ]
}

fn integrations() -> Vec<NodeDefinition> {
    use NodeCategory::Integration;
    vec![
        node(Integration, "webhook", "Webhook", "Calls an external URL")
            .icon("globe")
            .field(Field::text("url", "URL").required().placeholder("https://example.com/hook"))
            .field(
                Field::select(
                    "method",
                    "Method",
                    &[("POST", "POST"), ("PUT", "PUT"), ("GET", "GET")],
                )
                .required()
                .default_value("POST"),
            )
            .field(Field::json("headers", "Headers").default_value(json!({}))),
        node(Integration, "google_sheets", "Google Sheets", "Appends a row to a spreadsheet")
            .icon("table")
            .field(Field::text("spreadsheet_id", "Spreadsheet").required())
            .field(Field::text("sheet", "Sheet").default_value("Sheet1")),
        node(Integration, "zapier", "Zapier", "Hands the run data to a Zap")
            .icon("zap")
            .field(Field::text("hook_url", "Zap hook URL").required()),
    ]
}
