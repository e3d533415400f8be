//! Prompt text and the fixed kitchen-object catalog.

use super::generator::MatchCandidate;

/// Objects the random branch picks from.
pub const KITCHEN_OBJECTS: [&str; 23] = [
    "rolling pin",
    "whisk",
    "spatula",
    "wooden spoon",
    "measuring cup",
    "colander",
    "cheese grater",
    "can opener",
    "potato masher",
    "ladle",
    "tongs",
    "peeler",
    "cutting board",
    "mixing bowl",
    "tea kettle",
    "coffee mug",
    "salt shaker",
    "pepper mill",
    "timer",
    "oven mitt",
    "apron",
    "dish towel",
    "cookie jar",
];

/// Used when analysis output yields no description at all.
pub const PLACEHOLDER_DESCRIPTION: &str = "A cherished everyday object.";
/// Used when analysis output yields no narrative at all.
pub const PLACEHOLDER_MEMORY: &str =
    "This object holds a special place in my heart, though the details of its story are still waiting to be written.";

pub fn narrative_prompt(object: &str) -> String {
    format!(
        "Generate a nostalgic, personal memory about a {object} that someone might have. \
         The memory should be 2-3 sentences and include specific details about when they got it, \
         why it's meaningful, and what emotions it evokes. Make it realistic and heartfelt, like \
         the example: \"I bought this rolling pin about 5 years ago during covid when I was stuck \
         at home and was baking a lot of bread. It brings back both good memories of making \
         sourdough, but also sad memories of how much covid prevented me from seeing my friends \
         and family.\" Respond with the memory only."
    )
}

pub fn illustration_prompt(object: &str) -> String {
    format!(
        "A simple, clean, cartoonish illustration of a {object} on a white background. \
         The style should be friendly, colorful, and slightly whimsical. The object should be \
         the main focus, centered in the image."
    )
}

/// Asks for a description rich enough to recognise this exact item later.
pub fn generated_image_description_prompt(object: &str) -> String {
    format!(
        "This image shows a {object}. Describe this specific {object} in as much detail as \
         possible so it could be told apart from any other {object}. Include its shape, \
         approximate measurements and proportions, colors, materials and textures, any \
         imperfections such as scratches, chips, stains or wear, and any unique markings, \
         patterns, text or logos. Respond with the description only, as plain text."
    )
}

pub const ANALYSIS_PROMPT: &str = "Look at the object in this photo. Respond with a JSON object \
and nothing else, in exactly this form: {\"description\": \"...\", \"memory\": \"...\"}. \
\"description\" is a detailed description of the object: what it is, its shape, approximate size, \
colors, materials, wear, imperfections and any unique markings. \"memory\" is a nostalgic, personal \
2-3 sentence memory that someone who owns this object might have, written in the first person, \
with specific details about when they got it and what emotions it evokes.";

pub const MATCHING_DESCRIPTION_PROMPT: &str = "Describe the object in this photo in as much \
detail as possible so it could be recognised again: what it is, its shape, approximate \
measurements, colors, materials, textures, wear, imperfections and any unique markings, patterns, \
text or logos. Ignore any hands, fingers, or other human body parts visible in the photo and \
describe only the object. Respond with the description only, as plain text.";

/// Ask the model to pick at most one candidate that is the same physical object.
pub fn match_prompt(new_description: &str, candidates: &[MatchCandidate]) -> String {
    let listing = candidates
        .iter()
        .map(|c| format!("- id: {}\n  description: {}", c.id, c.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "A user photographed an object and it was described as:\n\n\"{new_description}\"\n\n\
         Here are descriptions of objects saved earlier:\n\n{listing}\n\n\
         Decide whether the photographed object is the same physical object as one of the saved \
         objects, not merely the same kind of object. Compare specific details such as \
         measurements, colors, imperfections and unique markings. Respond with a JSON object and \
         nothing else, in exactly this form: \
         {{\"matchedId\": \"<id or null>\", \"confidence\": <0-100>, \"reasoning\": \"...\"}}. \
         Use null for matchedId if no saved object matches."
    )
}
