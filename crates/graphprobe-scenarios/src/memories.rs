//! Conversation memories and search queries used by the memory flow.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleMemory {
    pub name: &'static str,
    pub content: &'static str,
    pub source_description: &'static str,
}

pub const SAMPLE_MEMORIES: [SampleMemory; 3] = [
    SampleMemory {
        name: "user_preference_discussion",
        content: "The user mentioned they prefer working with TypeScript over JavaScript because \
                  of the type safety. They also said they like using React with Next.js for web \
                  development. They dislike debugging CSS issues and prefer using Tailwind CSS.",
        source_description: "User preference conversation about programming languages and tools",
    },
    SampleMemory {
        name: "project_requirements_meeting",
        content: "Sarah Chen, the product manager at DevFlow Corp, outlined the requirements for \
                  the new customer dashboard. The project needs real-time analytics, user \
                  authentication with SSO, data export to CSV/Excel, and mobile responsive design. \
                  The deadline is Q1 2024 and the budget is $50K.",
        source_description: "Project requirements gathering session",
    },
    SampleMemory {
        name: "technical_discussion",
        content: "Discussion about implementing microservices architecture. The team decided to \
                  use Docker containers, Kubernetes for orchestration, and PostgreSQL for the main \
                  database. Redis will be used for caching. The API will be RESTful with GraphQL \
                  for complex queries.",
        source_description: "Technical architecture planning session",
    },
];

pub const SAMPLE_SEARCHES: [&str; 4] = [
    "TypeScript programming preferences",
    "Sarah Chen product manager requirements",
    "microservices Docker Kubernetes architecture",
    "DevFlow Corp customer dashboard",
];

/// Episode name for `memory` within one validation run.
pub fn run_scoped_name(memory: &SampleMemory, run_id: &str) -> String {
    format!("{}-{run_id}", memory.name)
}
